//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the identification pipeline and
//! the models and rule tables it relies on. Implementations live in other crates.
//!
//! Model calls are async so a caller can cancel one by dropping its future;
//! the pipeline's stage timeouts rely on that to release the connection.

use crate::{DecodeOutcome, LabelImage};
use async_trait::async_trait;

/// Trait for text-only language model calls
///
/// Implemented by the infrastructure layer (partsight-llm). Used for the
/// structuring and enrichment stages; never receives an image.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Error type for model calls
    type Error;

    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Name of the model answering the calls
    fn model_name(&self) -> &str;
}

/// Trait for vision-capable language model calls
///
/// Implemented by the infrastructure layer (partsight-llm). Used for the OCR
/// stage and the direct fallback identification.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Error type for model calls
    type Error;

    /// Answer `prompt` about the given images
    async fn describe_images(&self, images: &[LabelImage], prompt: &str) -> Result<String, Self::Error>;

    /// Name of the model answering the calls
    fn model_name(&self) -> &str;
}

/// Trait for deterministic part-number decoding
///
/// Implemented by partsight-decoder. Implementations must be pure: the same
/// input always yields the same outcome.
pub trait PartDecoder {
    /// Decode a part number into protected spec fields
    fn decode(&self, part_number: &str) -> DecodeOutcome;
}
