//! Partsight Domain Layer
//!
//! This crate contains the data model and trait seams for turning a photographed
//! component label into a structured product specification. It performs no I/O
//! and only depends on `uuid` for request identifiers and `async-trait` for the
//! model seams.
//!
//! ## Key Concepts
//!
//! - **RawLabelText**: verbatim text transcribed from a label photo
//! - **DraftSpec**: an unverified spec proposed by a language model
//! - **DecodedSpec**: fields derived deterministically from a part number; every
//!   field is protected and survives all later stages unchanged
//! - **EnrichedSpec**: the final union of decoded and model-provided fields
//! - **IdentificationResult**: what a pipeline run hands to its caller, including
//!   the path taken and a per-stage trace
//!
//! ## Architecture
//!
//! - Pure data types and merge-free value objects only
//! - Model providers and the part decoder are reached through the traits in
//!   [`traits`]; implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decoded;
pub mod quantity;
pub mod request;
pub mod result;
pub mod spec;
pub mod traits;

// Re-exports for convenience
pub use decoded::{DecodeOutcome, DecodedSpec};
pub use quantity::{QuantityEstimate, QuantitySource};
pub use request::{LabelImage, RequestId};
pub use result::{
    EnrichedSpec, IdentificationResult, PipelinePath, PipelineState, PipelineTrace,
    StageOutcome, StageRecord,
};
pub use spec::{DraftSpec, RawLabelText, SpecField, SpecSheet};
