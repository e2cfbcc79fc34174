//! Error types for the identification pipeline

use partsight_domain::{PipelineState, PipelineTrace};
use partsight_llm::LlmError;
use thiserror::Error;

/// Errors that can occur during identification
///
/// Only `IdentificationFailed`, `InvalidInput` and `Config` ever reach a
/// caller of [`crate::Pipeline::identify`]. The stage variants are recovered
/// inside the run (fallback or degraded enrichment) and end up in the trace.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// OCR timed out or produced no usable text
    #[error("Transcription failed: {0}")]
    TranscriptionFailure(String),

    /// Structured output was malformed or lacked required fields
    #[error("Structuring output unusable: {0}")]
    StructuringParseFailure(String),

    /// Enrichment call or reply failed
    #[error("Enrichment failed: {0}")]
    EnrichmentFailure(String),

    /// Transport-level failure reaching a model
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// A stage exceeded its time budget
    #[error("{stage} stage timed out after {secs}s")]
    Timeout {
        /// Stage that timed out
        stage: PipelineState,
        /// Budget that was exceeded
        secs: u64,
    },

    /// Neither the normal nor the fallback path produced a spec
    #[error("Identification failed: {reason}")]
    IdentificationFailed {
        /// Why the fallback call failed
        reason: String,
        /// Everything the run recorded before giving up
        trace: PipelineTrace,
    },

    /// The request itself was unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Map a failed model call onto the error kind for `stage`
    pub(crate) fn from_model(stage: PipelineState, err: LlmError) -> Self {
        match err {
            LlmError::Timeout(secs) => PipelineError::Timeout { stage, secs },
            LlmError::Communication(msg) | LlmError::ModelNotAvailable(msg) => {
                PipelineError::ModelUnavailable(msg)
            }
            LlmError::RateLimitExceeded => {
                PipelineError::ModelUnavailable("rate limit exceeded".to_string())
            }
            other => Self::for_stage(stage, other.to_string()),
        }
    }

    /// Stage-specific failure carrying `reason`
    pub(crate) fn for_stage(stage: PipelineState, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match stage {
            PipelineState::Ocr => PipelineError::TranscriptionFailure(reason),
            PipelineState::Structure => PipelineError::StructuringParseFailure(reason),
            PipelineState::Enrich => PipelineError::EnrichmentFailure(reason),
            _ => PipelineError::ModelUnavailable(reason),
        }
    }

    /// The trace collected before an identification failure
    pub fn trace(&self) -> Option<&PipelineTrace> {
        match self {
            PipelineError::IdentificationFailed { trace, .. } => Some(trace),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::StructuringParseFailure(format!("JSON parse error: {}", e))
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(e: toml::de::Error) -> Self {
        PipelineError::Config(format!("Failed to parse TOML: {}", e))
    }
}

impl From<toml::ser::Error> for PipelineError {
    fn from(e: toml::ser::Error) -> Self {
        PipelineError::Config(format!("Failed to serialize to TOML: {}", e))
    }
}
