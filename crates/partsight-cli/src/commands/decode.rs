//! Decode command implementation.

use crate::cli::DecodeArgs;
use crate::error::Result;
use crate::output::Formatter;
use partsight_decoder::Decoder;
use partsight_domain::DecodeOutcome;

/// Execute the decode command.
pub fn execute_decode(args: DecodeArgs, decoder: &Decoder, formatter: &Formatter) -> Result<()> {
    let outcomes = decode_all(args.parts, decoder);
    println!("{}", formatter.format_decoded(&outcomes)?);
    Ok(())
}

fn decode_all(parts: Vec<String>, decoder: &Decoder) -> Vec<(String, DecodeOutcome)> {
    parts
        .into_iter()
        .map(|part| {
            let outcome = decoder.decode(&part);
            (part, outcome)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_all_keeps_order() {
        let outcomes = decode_all(
            vec!["not-a-part".to_string(), "HMT451U6AFR8A-PB".to_string()],
            &Decoder::standard(),
        );
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].0, "not-a-part");
        assert!(!outcomes[0].1.is_match());
        assert!(outcomes[1].1.is_match());
    }
}
