//! Decoded module - deterministic part-number decode results

use crate::spec::{SpecField, SpecSheet};
use std::collections::BTreeSet;

/// Spec fields produced by a single matched decoding rule
///
/// Every field in a decoded spec is protected: no later stage may replace it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSpec {
    /// Manufacturer family whose rule matched (e.g. "SK hynix")
    pub family: String,

    /// Normalized part number that was decoded
    pub part_number: String,

    /// Decoded fields, including `manufacturer`
    pub fields: SpecSheet,
}

impl DecodedSpec {
    /// Create a decoded spec
    pub fn new(family: impl Into<String>, part_number: impl Into<String>, fields: SpecSheet) -> Self {
        Self {
            family: family.into(),
            part_number: part_number.into(),
            fields,
        }
    }

    /// Keys that later stages must not change
    pub fn protected_keys(&self) -> BTreeSet<String> {
        self.fields.keys().map(str::to_string).collect()
    }

    /// Look up a canonical field
    pub fn field(&self, field: SpecField) -> Option<&str> {
        self.fields.field(field)
    }

    /// Number of decoded fields other than the manufacturer
    pub fn decoded_field_count(&self) -> usize {
        self.fields
            .keys()
            .filter(|k| *k != SpecField::Manufacturer.key())
            .count()
    }
}

/// Outcome of running the part decoder
///
/// `NoMatch` is an expected outcome, not an error: it means "proceed with
/// model-derived values only".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// A rule matched and produced at least one field
    Match(DecodedSpec),

    /// No rule matched, or the matching rule could not extract any field
    NoMatch,
}

impl DecodeOutcome {
    /// True for `Match`
    pub fn is_match(&self) -> bool {
        matches!(self, DecodeOutcome::Match(_))
    }

    /// Borrow the decoded spec, if any
    pub fn as_decoded(&self) -> Option<&DecodedSpec> {
        match self {
            DecodeOutcome::Match(spec) => Some(spec),
            DecodeOutcome::NoMatch => None,
        }
    }

    /// Convert into an `Option`
    pub fn into_decoded(self) -> Option<DecodedSpec> {
        match self {
            DecodeOutcome::Match(spec) => Some(spec),
            DecodeOutcome::NoMatch => None,
        }
    }
}
