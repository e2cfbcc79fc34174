//! Part-number normalization and label-text scanning

use regex::Regex;
use std::sync::OnceLock;

/// Tokens in OCR text that could be a part number
static CANDIDATE_TOKEN: OnceLock<Regex> = OnceLock::new();

fn candidate_token() -> &'static Regex {
    CANDIDATE_TOKEN.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9][A-Za-z0-9/_-]{5,}").expect("candidate token regex must compile")
    })
}

/// Normalize a part number before matching
///
/// Trims, upper-cases and collapses every run of whitespace, hyphens and
/// underscores into a single `-`. Leading and trailing separators are removed,
/// so `" hmt451u6afr8a - pb "` and `"HMT451U6AFR8A-PB"` normalize identically.
pub fn normalize(part_number: &str) -> String {
    let mut out = String::with_capacity(part_number.len());
    let mut pending_sep = false;
    for c in part_number.chars() {
        if c.is_whitespace() || c == '-' || c == '_' {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('-');
        }
        pending_sep = false;
        out.extend(c.to_uppercase());
    }
    out
}

/// Split a normalized part number into body and optional `-` suffix
pub(crate) fn split_suffix(normalized: &str) -> (&str, Option<&str>) {
    match normalized.split_once('-') {
        Some((body, suffix)) => (body, Some(suffix)),
        None => (normalized, None),
    }
}

/// Tokens from free text that look like part numbers, in reading order
///
/// A token starts with a letter or digit and is at least six characters of
/// letters, digits, `/`, `_` or `-`.
pub fn candidate_tokens(text: &str) -> impl Iterator<Item = &str> {
    candidate_token().find_iter(text).map(|m| m.as_str())
}
