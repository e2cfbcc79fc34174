//! Partsight Model Provider Layer
//!
//! Implementations of the [`TextModel`] and [`VisionModel`] traits from
//! `partsight-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing, usable as either model
//! - `OllamaProvider`: Local Ollama API integration (text and vision)
//!
//! # Examples
//!
//! ```
//! use partsight_llm::MockProvider;
//! use partsight_domain::traits::TextModel;
//!
//! let provider = MockProvider::new("Hello from the model!");
//! let result = tokio_test::block_on(provider.generate("test prompt")).unwrap();
//! assert_eq!(result, "Hello from the model!");
//! ```

#![warn(missing_docs)]

pub mod models;
pub mod ollama;

use async_trait::async_trait;
use partsight_domain::traits::{TextModel, VisionModel};
use partsight_domain::LabelImage;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

pub use models::{resolve_model, TEXT_MODELS, VISION_MODELS};
pub use ollama::OllamaProvider;

/// Errors that can occur during model calls
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the model
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// The request did not complete in time
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// True for failures worth one more attempt (transport, timeout, rate limit)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Communication(_) | LlmError::Timeout(_) | LlmError::RateLimitExceeded
        )
    }
}

/// What the mock answers with
#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(LlmError),
}

impl Reply {
    fn into_result(self) -> Result<String, LlmError> {
        match self {
            Reply::Text(text) => Ok(text),
            Reply::Fail(err) => Err(err),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    queued: VecDeque<Reply>,
    rules: Vec<(String, Reply)>,
    prompts: Vec<String>,
    image_counts: Vec<usize>,
}

/// Mock model provider for deterministic testing
///
/// Returns pre-configured responses without making any network calls. Both
/// [`TextModel`] and [`VisionModel`] are implemented, so the same type stands
/// in for either model.
///
/// A reply is chosen in this order:
///
/// 1. the next queued reply (`push_response` / `push_error`), if any
/// 2. the first rule whose pattern occurs in the prompt (`add_response` / `add_error`)
/// 3. the default response
///
/// # Examples
///
/// ```
/// use partsight_llm::{LlmError, MockProvider};
/// use partsight_domain::traits::TextModel;
///
/// let mut provider = MockProvider::default();
/// provider.add_response("Structure", "{\"model\": \"KVR16S11/4\"}");
/// provider.push_error(LlmError::Timeout(120));
///
/// // Queued replies come first
/// # tokio_test::block_on(async {
/// assert!(provider.generate("Structure this").await.is_err());
/// assert_eq!(provider.generate("Structure this").await.unwrap(), "{\"model\": \"KVR16S11/4\"}");
/// assert_eq!(provider.call_count(), 2);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    model_name: String,
    delay: Option<Duration>,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            model_name: "mock".to_string(),
            delay: None,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Set the reported model name
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    /// Sleep this long before every reply
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A poisoned lock only means another test thread panicked mid-call
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Answer prompts containing `pattern` with `response`
    pub fn add_response(&mut self, pattern: impl Into<String>, response: impl Into<String>) {
        self.state()
            .rules
            .push((pattern.into(), Reply::Text(response.into())));
    }

    /// Fail prompts containing `pattern`
    pub fn add_error(&mut self, pattern: impl Into<String>, error: LlmError) {
        self.state().rules.push((pattern.into(), Reply::Fail(error)));
    }

    /// Queue a one-shot response for the next call
    pub fn push_response(&self, response: impl Into<String>) {
        self.state().queued.push_back(Reply::Text(response.into()));
    }

    /// Queue a one-shot failure for the next call
    pub fn push_error(&self, error: LlmError) {
        self.state().queued.push_back(Reply::Fail(error));
    }

    /// Get the number of calls made
    pub fn call_count(&self) -> usize {
        self.state().prompts.len()
    }

    /// Every prompt received, in order
    pub fn prompts(&self) -> Vec<String> {
        self.state().prompts.clone()
    }

    /// Number of images attached to each vision call, in order
    pub fn image_counts(&self) -> Vec<usize> {
        self.state().image_counts.clone()
    }

    /// Reset the call count and recorded prompts
    pub fn reset_call_count(&self) {
        let mut state = self.state();
        state.prompts.clear();
        state.image_counts.clear();
    }

    /// Sleep (if configured), then record the call and pick a reply
    ///
    /// Nothing is recorded until the delay has passed, so a call whose
    /// future is dropped mid-delay leaves no trace.
    async fn respond(&self, prompt: &str, images: Option<usize>) -> Result<String, LlmError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.prompts.push(prompt.to_string());
        if let Some(count) = images {
            state.image_counts.push(count);
        }

        if let Some(reply) = state.queued.pop_front() {
            return reply.into_result();
        }
        if let Some((_, reply)) = state.rules.iter().find(|(p, _)| prompt.contains(p.as_str())) {
            return reply.clone().into_result();
        }
        Ok(self.default_response.clone())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl TextModel for MockProvider {
    type Error = LlmError;

    async fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        self.respond(prompt, None).await
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[async_trait]
impl VisionModel for MockProvider {
    type Error = LlmError;

    async fn describe_images(&self, images: &[LabelImage], prompt: &str) -> Result<String, Self::Error> {
        self.respond(prompt, Some(images.len())).await
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = provider.generate("any prompt").await;
        assert_eq!(result.unwrap(), "Test response");
    }

    #[tokio::test]
    async fn test_mock_provider_pattern_responses() {
        let mut provider = MockProvider::default();
        provider.add_response("hello", "world");
        provider.add_response("foo", "bar");

        assert_eq!(provider.generate("say hello please").await.unwrap(), "world");
        assert_eq!(provider.generate("foo").await.unwrap(), "bar");
        assert_eq!(provider.generate("unknown").await.unwrap(), "Default mock response");
    }

    #[tokio::test]
    async fn test_mock_provider_call_count() {
        let provider = MockProvider::new("test");

        assert_eq!(provider.call_count(), 0);

        provider.generate("prompt1").await.unwrap();
        assert_eq!(provider.call_count(), 1);

        provider.generate("prompt2").await.unwrap();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.prompts(), vec!["prompt1", "prompt2"]);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_provider_error() {
        let mut provider = MockProvider::default();
        provider.add_error("bad prompt", LlmError::Other("Mock error".to_string()));

        let result = provider.generate("a bad prompt").await;
        assert!(matches!(result.unwrap_err(), LlmError::Other(_)));
    }

    #[tokio::test]
    async fn test_mock_provider_queue_is_one_shot() {
        let provider = MockProvider::new("steady");
        provider.push_error(LlmError::Communication("reset".to_string()));
        provider.push_response("first");

        assert!(provider.generate("x").await.unwrap_err().is_transient());
        assert_eq!(provider.generate("x").await.unwrap(), "first");
        assert_eq!(provider.generate("x").await.unwrap(), "steady");
    }

    #[tokio::test]
    async fn test_mock_provider_vision_records_images() {
        let provider = MockProvider::new("HMT451U6AFR8A-PB").with_model_name("vision-mock");
        let images = vec![LabelImage::new(vec![1, 2, 3]), LabelImage::new(vec![4])];

        let text = provider.describe_images(&images, "transcribe").await.unwrap();
        assert_eq!(text, "HMT451U6AFR8A-PB");
        assert_eq!(provider.image_counts(), vec![2]);
        assert_eq!(VisionModel::model_name(&provider), "vision-mock");
    }

    #[tokio::test]
    async fn test_mock_provider_clone() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.generate("test").await.unwrap();

        // Both share state through the Arc
        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }

    #[tokio::test]
    async fn test_dropped_call_is_not_recorded() {
        let provider = MockProvider::new("late").with_delay(Duration::from_millis(500));

        let result = tokio::time::timeout(Duration::from_millis(50), provider.generate("slow")).await;
        assert!(result.is_err());

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_transient_errors() {
        assert!(LlmError::Timeout(30).is_transient());
        assert!(LlmError::Communication("refused".to_string()).is_transient());
        assert!(LlmError::RateLimitExceeded.is_transient());
        assert!(!LlmError::InvalidResponse("bad".to_string()).is_transient());
        assert!(!LlmError::ModelNotAvailable("llava".to_string()).is_transient());
    }
}
