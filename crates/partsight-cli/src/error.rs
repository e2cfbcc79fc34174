//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model server could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// No suitable model installed
    #[error("No {kind} model available on {endpoint}")]
    NoModel {
        /// "vision" or "text"
        kind: &'static str,
        /// Endpoint that was asked
        endpoint: String,
    },

    /// Model provider error
    #[error("Model error: {0}")]
    Llm(#[from] partsight_llm::LlmError),

    /// Pipeline error
    #[error("{0}")]
    Pipeline(#[from] partsight_pipeline::PipelineError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not permitted
    #[error("Operation not permitted: {0}")]
    NotPermitted(String),
}
