//! Model service trait for abstracting different backends
//!
//! Enables swapping between Argo, Ollama and OpenAI-compatible services.
//! A service only moves text: role mapping, size limits, retries and reply
//! parsing live in the adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::Result;
use crate::llm::roles::RoleMap;

/// A message in the vocabulary of the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl WireMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Sampling parameters
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Temperature for sampling (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Nucleus sampling
    pub top_p: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

/// One request to the model service
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [WireMessage],
    pub options: &'a GenerateOptions,
}

/// Trait for model services
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Send the conversation and return the assistant text.
    ///
    /// Transient failures must come back as retryable
    /// `ScribeError::ModelRequest`; refusals as `ScribeError::ModelRejected`.
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String>;

    /// How conversation roles map onto this service's roles
    fn role_map(&self) -> &'static RoleMap;

    /// Get the service name
    fn name(&self) -> &str;
}
