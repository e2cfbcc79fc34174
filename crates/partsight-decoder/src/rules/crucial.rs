//! Crucial: `CT<capacity>G<generation><form letters><speed>...`
//!
//! DDR3/DDR4 parts carry a single generation digit after the `G`
//! (`CT8G4SFS832A`); DDR5 parts carry the two-digit rate instead and close
//! with `S5`/`U5` for the form factor (`CT16G48C40U5`).

use crate::module::{FormFactor, Generation, ModuleFields};
use crate::normalize::split_suffix;

const MANUFACTURER: &str = "Crucial";

pub(super) const SAMPLES: &[&str] = &["CT8G4SFS832A", "CT16G4DFD8266", "CT16G48C40U5", "CT4G3S160BM"];

/// Split `CT<digits>G<rest>` into capacity digits and the rest
fn capacity_split(pn: &str) -> Option<(&str, &str)> {
    let after_ct = pn.strip_prefix("CT")?;
    let digits_len = after_ct.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits_len == 0 {
        return None;
    }
    let rest = after_ct[digits_len..].strip_prefix('G')?;
    Some((&after_ct[..digits_len], rest))
}

pub(super) fn matches(pn: &str) -> bool {
    capacity_split(pn)
        .and_then(|(_, rest)| rest.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}

pub(super) fn extract(pn: &str) -> ModuleFields {
    let mut fields = ModuleFields::new(MANUFACTURER);
    let (body, _) = split_suffix(pn);
    let Some((capacity, rest)) = capacity_split(body) else {
        return fields;
    };
    fields.capacity_gb = capacity.parse().ok();

    if let Some(mts) = rest.get(0..2).and_then(ddr5_rate) {
        fields.generation = Some(Generation::Ddr5);
        fields.mts = Some(mts);
        fields.form_factor = if body.ends_with("S5") {
            Some(FormFactor::SoDimm)
        } else if body.ends_with("U5") {
            Some(FormFactor::UDimm)
        } else {
            None
        };
        return fields;
    }

    let mut chars = rest.chars();
    fields.generation = chars.next().and_then(Generation::from_digit);
    fields.form_factor = match chars.next() {
        Some('S') => Some(FormFactor::SoDimm),
        Some('D') => Some(FormFactor::UDimm),
        _ => None,
    };
    fields.mts = trailing_digits(rest.get(1..).unwrap_or_default()).and_then(speed_code);
    fields
}

fn ddr5_rate(code: &str) -> Option<u32> {
    match code {
        "48" => Some(4800),
        "52" => Some(5200),
        "56" => Some(5600),
        _ => None,
    }
}

/// Last run of digits, ignoring any trailing letters
fn trailing_digits(s: &str) -> Option<&str> {
    let end = s.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let start = end.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let digits = &end[start..];
    (!digits.is_empty()).then_some(digits)
}

/// Speed code, optionally prefixed with an `8` (x8 organisation)
fn speed_code(code: &str) -> Option<u32> {
    speed(code).or_else(|| code.strip_prefix('8').and_then(speed))
}

fn speed(code: &str) -> Option<u32> {
    match code {
        "32" => Some(3200),
        "29" | "293" => Some(2933),
        "26" | "266" => Some(2666),
        "24" => Some(2400),
        "21" | "213" => Some(2133),
        "186" => Some(1866),
        "160" => Some(1600),
        "133" => Some(1333),
        _ => None,
    }
}
