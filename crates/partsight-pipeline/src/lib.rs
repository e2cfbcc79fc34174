//! Partsight Identification Pipeline
//!
//! Turns photos of a component label into an [`IdentificationResult`] without
//! letting a vision model's guesses override facts proven by part-number
//! decoding.
//!
//! # Architecture
//!
//! ```text
//! images → OCR (vision) → structure (text only) → decode → merge → enrich (text) → result
//!     └──────── fallback: images → draft (vision, one call) ──┘
//! ```
//!
//! # Key Features
//!
//! - **Two-step OCR**: the vision model only transcribes; a text-only model
//!   organizes the transcription, so it cannot invent visual facts
//! - **Protected fields**: decoded values survive enrichment unchanged,
//!   enforced after the model call
//! - **Quantity detection**: visual count reconciled with part-number
//!   repetition in the label text
//! - **Bounded latency**: per-stage timeouts, at most one retry per stage
//! - **Traceable**: every transition and stage outcome is recorded
//!
//! # Example Usage
//!
//! ```
//! use partsight_domain::{LabelImage, PipelinePath, SpecField};
//! use partsight_llm::MockProvider;
//! use partsight_pipeline::{Pipeline, PipelineConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut vision = MockProvider::default();
//! vision.add_response("Transcribe", "KVR16S11/4 4GB 1.5V");
//! let mut text = MockProvider::default();
//! text.add_response("Organize", r#"{"manufacturer": "Kingston", "model": "KVR16S11/4"}"#);
//! text.add_response("Complete", "UNKNOWN");
//!
//! let pipeline = Pipeline::standard(vision, text, PipelineConfig::default())?;
//! let result = pipeline.identify(vec![LabelImage::new(vec![0xFF, 0xD8])]).await?;
//!
//! assert_eq!(result.path, PipelinePath::Normal);
//! assert_eq!(result.spec.field(SpecField::Capacity), Some("4GB"));
//! assert!(result.enrichment_skipped);
//! # Ok(())
//! # }
//! # tokio_test::block_on(example()).unwrap();
//! ```

#![warn(missing_docs)]

mod config;
mod error;
pub mod merge;
pub mod parser;
mod pipeline;
pub mod prompt;
pub mod quantity;
pub mod title;

#[cfg(test)]
mod tests;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use merge::MergedSpec;
pub use pipeline::Pipeline;
pub use quantity::{QuantityDetector, Reconciliation};
pub use title::compose_title;

pub use partsight_domain::IdentificationResult;
