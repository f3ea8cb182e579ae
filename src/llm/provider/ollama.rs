//! Ollama client implementation
//!
//! Non-streaming calls to `/api/chat`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::core::config::ModelConfig;
use crate::core::Result;
use crate::llm::provider::{http_client, post_json, text_at};
use crate::llm::roles::{RoleMap, OLLAMA_ROLES};
use crate::llm::traits::{CompletionRequest, ModelService, WireMessage};

/// Ollama chat request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [WireMessage],
    options: OllamaOptions,
    stream: bool,
}

/// Ollama generation options
#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama API client
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

#[async_trait]
impl ModelService for OllamaClient {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let body = ChatRequest {
            model: request.model,
            messages: request.messages,
            options: OllamaOptions {
                temperature: request.options.temperature,
                top_p: request.options.top_p,
                num_predict: request.options.max_tokens,
            },
            stream: false,
        };

        let reply = post_json(&self.client, &self.chat_url(), &body, None).await?;
        text_at(&reply, "/message/content")
    }

    fn role_map(&self) -> &'static RoleMap {
        &OLLAMA_ROLES
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
