//! Scan command implementation.

use crate::error::Result;
use crate::output::Formatter;
use partsight_decoder::{candidate_tokens, Decoder};
use partsight_domain::DecodedSpec;
use std::collections::BTreeSet;

/// Execute the scan command on already-read text.
pub fn execute_scan(text: &str, decoder: &Decoder, formatter: &Formatter) -> Result<()> {
    let found = scan_text(text, decoder);
    println!("{}", formatter.format_scan(&found)?);
    Ok(())
}

/// Every distinct decodable part number in `text`, in reading order
fn scan_text(text: &str, decoder: &Decoder) -> Vec<DecodedSpec> {
    let mut seen = BTreeSet::new();
    candidate_tokens(text)
        .filter_map(|token| decoder.decode(token).into_decoded())
        .filter(|decoded| seen.insert(decoded.part_number.clone()))
        .collect()
}
