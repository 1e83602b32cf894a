//! Language model client used by the analyzer stages.
//!
//! The pipeline only sees [`LlmHandle`]: either a live model behind the
//! [`LanguageModel`] trait, or the explicit `Unavailable` variant that makes
//! every stage use its fallback answer.

use crate::models::Category;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while talking to a language model.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to Ollama at {0}. Is Ollama running?")]
    Connect(String),

    #[error("Ollama API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode model response: {0}")]
    Decode(String),

    #[error("failed to send request: {0}")]
    Request(String),
}

/// A model that answers a system prompt plus a user prompt with free text.
pub trait LanguageModel: Send + Sync {
    /// Name reported in run metadata.
    fn name(&self) -> &str;

    fn analyze<'a>(&'a self, system: &'a str, user: &'a str)
        -> BoxFuture<'a, Result<String, LlmError>>;
}

/// Settings for the Ollama client.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.2,
            timeout_seconds: 60,
        }
    }
}

/// Message in an Ollama chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

/// Non-streaming client for the Ollama `/api/chat` endpoint.
pub struct OllamaClient {
    config: OllamaConfig,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, LlmError> {
        info!(
            "Initializing Ollama client with model {} at {}",
            config.model_name, config.ollama_url
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.config.ollama_url.trim_end_matches('/'));

        let request = OllamaChatRequest {
            model: &self.config.model_name,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        debug!("Sending chat request to {}", url);

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.config.timeout_seconds)
                } else if e.is_connect() {
                    LlmError::Connect(self.config.ollama_url.clone())
                } else {
                    LlmError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        Ok(chat_response.message.content)
    }
}

impl LanguageModel for OllamaClient {
    fn name(&self) -> &str {
        &self.config.model_name
    }

    fn analyze<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> BoxFuture<'a, Result<String, LlmError>> {
        self.chat(system, user).boxed()
    }
}

/// A possibly absent language model, shared by every analyzer stage.
#[derive(Clone)]
pub enum LlmHandle {
    Available(Arc<dyn LanguageModel>),
    Unavailable,
}

impl LlmHandle {
    pub fn available(model: impl LanguageModel + 'static) -> Self {
        LlmHandle::Available(Arc::new(model))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, LlmHandle::Available(_))
    }

    pub fn model_name(&self) -> Option<&str> {
        match self {
            LlmHandle::Available(model) => Some(model.name()),
            LlmHandle::Unavailable => None,
        }
    }

    /// Ask the model on behalf of `category`.
    ///
    /// Returns `None` when no model is configured or the call failed; both
    /// cases are logged as warnings and the caller falls back.
    pub async fn consult(&self, category: Category, system: &str, user: &str) -> Option<String> {
        let model = match self {
            LlmHandle::Available(model) => model,
            LlmHandle::Unavailable => {
                warn!("No language model configured; {} analyzer uses its fallback", category);
                return None;
            }
        };

        match model.analyze(system, user).await {
            Ok(text) => {
                debug!("{} analyzer received {} bytes from {}", category, text.len(), model.name());
                Some(text)
            }
            Err(e) => {
                warn!("{} analyzer falling back after model error: {}", category, e);
                None
            }
        }
    }
}

impl fmt::Debug for LlmHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmHandle::Available(model) => f.debug_tuple("Available").field(&model.name()).finish(),
            LlmHandle::Unavailable => write!(f, "Unavailable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoModel;

    impl LanguageModel for EchoModel {
        fn name(&self) -> &str {
            "echo"
        }

        fn analyze<'a>(
            &'a self,
            _system: &'a str,
            user: &'a str,
        ) -> BoxFuture<'a, Result<String, LlmError>> {
            async move { Ok(format!("0.4\n{}", user)) }.boxed()
        }
    }

    struct BrokenModel;

    impl LanguageModel for BrokenModel {
        fn name(&self) -> &str {
            "broken"
        }

        fn analyze<'a>(
            &'a self,
            _system: &'a str,
            _user: &'a str,
        ) -> BoxFuture<'a, Result<String, LlmError>> {
            async move {
                Err(LlmError::Api {
                    status: 500,
                    body: "boom".to_string(),
                })
            }
            .boxed()
        }
    }

    #[test]
    fn test_ollama_config_default() {
        let config = OllamaConfig::default();
        assert_eq!(config.model_name, "llama3.2:latest");
        assert_eq!(config.ollama_url, "http://localhost:11434");
    }

    #[test]
    fn test_handle_reports_model_name() {
        let handle = LlmHandle::available(EchoModel);
        assert!(handle.is_available());
        assert_eq!(handle.model_name(), Some("echo"));
        assert_eq!(format!("{:?}", handle), "Available(\"echo\")");

        assert!(!LlmHandle::Unavailable.is_available());
        assert_eq!(LlmHandle::Unavailable.model_name(), None);
    }

    #[test]
    fn test_consult_available_model() {
        let handle = LlmHandle::available(EchoModel);
        let answer = tokio_test::block_on(handle.consult(Category::Phishing, "sys", "hello"));
        assert_eq!(answer.as_deref(), Some("0.4\nhello"));
    }

    #[test]
    fn test_consult_degrades_to_none() {
        let unavailable =
            tokio_test::block_on(LlmHandle::Unavailable.consult(Category::Rugpull, "sys", "x"));
        assert!(unavailable.is_none());

        let broken = LlmHandle::available(BrokenModel);
        let failed = tokio_test::block_on(broken.consult(Category::Rugpull, "sys", "x"));
        assert!(failed.is_none());
    }

    #[test]
    fn test_llm_error_messages() {
        assert_eq!(LlmError::Timeout(60).to_string(), "request timed out after 60s");
        let api = LlmError::Api {
            status: 404,
            body: "model not found".to_string(),
        };
        assert_eq!(api.to_string(), "Ollama API error 404: model not found");
    }
}
