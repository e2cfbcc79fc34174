//! Ollama Provider Implementation
//!
//! Provides integration with Ollama's local model API for both text-only and
//! vision calls.
//!
//! # Features
//!
//! - Async HTTP communication with the Ollama API
//! - Vision calls through `/api/chat` with base64 images, falling back to
//!   `/api/generate` for models that reject the chat endpoint
//! - Installed-model listing (`/api/tags`) for model selection
//! - Configurable per-request timeout and attempt count with exponential backoff
//!
//! # Examples
//!
//! ```no_run
//! use partsight_llm::OllamaProvider;
//!
//! # fn example() -> Result<(), partsight_llm::LlmError> {
//! let provider = OllamaProvider::new("http://localhost:11434", "qwen2.5vl:7b")?;
//!
//! // The TextModel / VisionModel trait implementations delegate to the
//! // inherent async methods, so dropping a call's future aborts the request.
//! # Ok(())
//! # }
//! ```

use crate::LlmError;
use async_trait::async_trait;
use base64::Engine as _;
use partsight_domain::traits::{TextModel, VisionModel};
use partsight_domain::LabelImage;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for model requests (2 minutes)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of attempts per call; the pipeline decides on retries
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Timeout for the model listing call
const TAGS_TIMEOUT_SECS: u64 = 10;

/// Ollama API provider for local inference
///
/// This provider communicates with a local Ollama instance. One provider
/// talks to one model; create two for separate vision and text models.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
}

/// Request body for the generate API
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<&'a [String]>,
    stream: bool,
}

/// Response from the generate API
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    images: &'a [String],
}

/// Request body for the chat API
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize, Default)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

/// Response from the chat API
#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

/// Response from the tags API
#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "qwen2.5vl:7b", "mistral-nemo:12b")
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Other`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Create a new Ollama provider on `http://localhost:11434`
    pub fn default_endpoint(model: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the maximum number of attempts per call
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Model this provider talks to
    pub fn model(&self) -> &str {
        &self.model
    }

    /// API endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.timeout.as_secs())
        } else {
            LlmError::Communication(format!("Request failed: {}", e))
        }
    }

    /// POST `body` to `path`, retrying transient failures with exponential backoff
    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, LlmError>
    where
        B: Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.endpoint, path);
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            match self
                .client
                .post(&url)
                .timeout(self.timeout)
                .json(body)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json::<R>().await.map_err(|e| {
                            LlmError::InvalidResponse(format!("Failed to parse response: {}", e))
                        });
                    } else if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(LlmError::ModelNotAvailable(self.model.clone()));
                    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(LlmError::RateLimitExceeded);
                    } else {
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        last_error = Some(LlmError::Communication(format!(
                            "HTTP {}: {}",
                            status, error_text
                        )));
                    }
                }
                Err(e) => {
                    last_error = Some(self.map_send_error(e));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                // Exponential backoff: 1s, 2s, 4s, etc.
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }

    /// Generate text using the generate API
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Ollama is not running
    /// - The model is not available
    /// - Network communication fails or times out
    /// - The response format is invalid
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            images: None,
            stream: false,
        };
        let response: GenerateResponse = self.post_json("/api/generate", &request).await?;
        Ok(response.response)
    }

    /// Ask the model about one or more images
    ///
    /// Tries the chat API first (required by most vision models). If the chat
    /// call is rejected or comes back empty, the legacy generate API is used.
    pub async fn describe_images(
        &self,
        images: &[LabelImage],
        prompt: &str,
    ) -> Result<String, LlmError> {
        let encoded: Vec<String> = images
            .iter()
            .map(|image| base64::engine::general_purpose::STANDARD.encode(&image.bytes))
            .collect();

        info!(
            model = %self.model,
            images = encoded.len(),
            "Calling vision model"
        );

        match self.chat_with_images(&encoded, prompt).await {
            Ok(text) if !text.trim().is_empty() => return Ok(text),
            Ok(_) => debug!("Chat API returned empty content, trying generate API"),
            Err(e @ LlmError::Timeout(_)) => return Err(e),
            Err(e) => debug!(error = %e, "Chat API failed, trying generate API"),
        }

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            images: Some(encoded.as_slice()),
            stream: false,
        };
        let response: GenerateResponse = self.post_json("/api/generate", &request).await?;
        Ok(response.response)
    }

    async fn chat_with_images(&self, images: &[String], prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
                images,
            }],
            stream: false,
        };
        let response: ChatResponse = self.post_json("/api/chat", &request).await?;
        Ok(response.message.content)
    }

    /// Names of all models installed on the server
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.endpoint);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(TAGS_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(LlmError::Communication(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse model list: {}", e)))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl TextModel for OllamaProvider {
    type Error = LlmError;

    async fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        OllamaProvider::generate(self, prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl VisionModel for OllamaProvider {
    type Error = LlmError;

    async fn describe_images(&self, images: &[LabelImage], prompt: &str) -> Result<String, Self::Error> {
        let text = OllamaProvider::describe_images(self, images, prompt).await;
        if let Err(e) = &text {
            warn!(model = %self.model, error = %e, "Vision call failed");
        }
        text
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
