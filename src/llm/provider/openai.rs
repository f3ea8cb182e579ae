//! OpenAI-compatible Provider
//!
//! `/chat/completions` with bearer auth; the reply text is the first choice.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::core::config::ModelConfig;
use crate::core::Result;
use crate::llm::provider::{http_client, post_json, text_at};
use crate::llm::roles::{RoleMap, OPENAI_ROLES};
use crate::llm::traits::{CompletionRequest, ModelService, WireMessage};

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [WireMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ModelService for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let body = CompletionBody {
            model: request.model,
            messages: request.messages,
            temperature: request.options.temperature,
            top_p: request.options.top_p,
            max_completion_tokens: request.options.max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let reply = post_json(&self.client, &url, &body, self.api_key.as_deref()).await?;
        text_at(&reply, "/choices/0/message/content")
    }

    fn role_map(&self) -> &'static RoleMap {
        &OPENAI_ROLES
    }

    fn name(&self) -> &str {
        "openai"
    }
}
