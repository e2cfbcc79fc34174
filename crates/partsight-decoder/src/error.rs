//! Error types for the Part Decoder

use thiserror::Error;

/// Rule table configuration errors
///
/// Decoding itself never fails: an unrecognized part number is
/// `DecodeOutcome::NoMatch`. These errors are raised when a table is built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecoderError {
    /// The table contains no rules
    #[error("Rule table is empty")]
    EmptyTable,

    /// The same rule appears twice
    #[error("Rule {0} appears more than once")]
    DuplicateRule(String),

    /// Two rules structurally claim the same part number
    #[error("Part number {part_number} is claimed by both {first} and {second}")]
    AmbiguousRules {
        /// Part number both rules match
        part_number: String,
        /// Higher-priority rule
        first: String,
        /// Lower-priority rule
        second: String,
    },
}
