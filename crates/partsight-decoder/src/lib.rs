//! Partsight Part Decoder
//!
//! Deterministic decoding of memory-module part numbers into protected spec
//! fields. No network, no randomness: the same input always yields the same
//! [`DecodeOutcome`].
//!
//! # Overview
//!
//! ```text
//! part number → normalize → RuleTable (first structural match) → ModuleFields → DecodedSpec
//! ```
//!
//! Five manufacturer families are covered: SK hynix, Samsung, Kingston,
//! Micron and Crucial. A part number no family recognizes, or one whose
//! family recognizes it but cannot recover any field, is `NoMatch`. That is
//! an expected branch, not an error.
//!
//! # Example Usage
//!
//! ```
//! use partsight_decoder::Decoder;
//! use partsight_domain::SpecField;
//!
//! let decoder = Decoder::standard();
//! let decoded = decoder.decode("HMT451U6AFR8A-PB").into_decoded().unwrap();
//!
//! assert_eq!(decoded.field(SpecField::Manufacturer), Some("SK hynix"));
//! assert_eq!(decoded.field(SpecField::Capacity), Some("4GB"));
//! assert_eq!(decoded.field(SpecField::Speed), Some("PC3-12800"));
//! ```

#![warn(missing_docs)]

mod error;
pub mod module;
mod normalize;
pub mod rules;

pub use error::DecoderError;
pub use module::{FormFactor, Generation, ModuleFields, SpeedGrade};
pub use normalize::{candidate_tokens, normalize};
pub use rules::{Rule, RuleTable};

use partsight_domain::traits::PartDecoder;
use partsight_domain::{DecodeOutcome, DecodedSpec};
use tracing::{debug, info};

/// Part decoder backed by a [`RuleTable`]
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    table: RuleTable,
}

impl Decoder {
    /// Create a decoder over a validated table
    pub fn new(table: RuleTable) -> Self {
        Self { table }
    }

    /// Decoder over all five families in standard order
    pub fn standard() -> Self {
        Self::new(RuleTable::standard())
    }

    /// The rule table in use
    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Decode a part number
    pub fn decode(&self, part_number: &str) -> DecodeOutcome {
        let normalized = normalize(part_number);
        if normalized.is_empty() {
            return DecodeOutcome::NoMatch;
        }

        let Some(rule) = self.table.first_match(&normalized) else {
            debug!(part_number = %normalized, "No decoding rule matched");
            return DecodeOutcome::NoMatch;
        };

        let decoded = DecodedSpec::new(
            rule.family(),
            normalized.as_str(),
            rule.extract(&normalized).into_sheet(),
        );
        if decoded.decoded_field_count() == 0 {
            debug!(
                part_number = %normalized,
                family = rule.family(),
                "Rule matched but no field could be recovered"
            );
            return DecodeOutcome::NoMatch;
        }

        info!(
            part_number = %normalized,
            family = rule.family(),
            fields = decoded.fields.len(),
            "Decoded part number"
        );
        DecodeOutcome::Match(decoded)
    }

    /// Scan free text (e.g. a label transcription) for the first token that
    /// decodes
    pub fn find_decodable(&self, text: &str) -> Option<DecodedSpec> {
        candidate_tokens(text).find_map(|token| self.decode(token).into_decoded())
    }
}

impl PartDecoder for Decoder {
    fn decode(&self, part_number: &str) -> DecodeOutcome {
        Decoder::decode(self, part_number)
    }
}

/// Decode with the standard rule table
pub fn decode(part_number: &str) -> DecodeOutcome {
    Decoder::standard().decode(part_number)
}
