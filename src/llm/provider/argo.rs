//! Argo Provider
//!
//! Argo gateway: one POST carrying the user name, model and messages,
//! answered with `{"response": "..."}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::core::config::ModelConfig;
use crate::core::Result;
use crate::llm::provider::{http_client, post_json, text_at};
use crate::llm::roles::{RoleMap, ARGO_ROLES};
use crate::llm::traits::{CompletionRequest, ModelService, WireMessage};

/// Argo chat request
#[derive(Debug, Serialize)]
struct ArgoRequest<'a> {
    user: &'a str,
    model: &'a str,
    messages: &'a [WireMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

/// Argo API client
#[derive(Clone)]
pub struct ArgoClient {
    client: Client,
    endpoint: String,
    user: String,
}

impl ArgoClient {
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            endpoint: config.endpoint.clone(),
            user: config.user.clone().unwrap_or_default(),
        })
    }
}

#[async_trait]
impl ModelService for ArgoClient {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let body = ArgoRequest {
            user: &self.user,
            model: request.model,
            messages: request.messages,
            temperature: request.options.temperature,
            top_p: request.options.top_p,
            max_completion_tokens: request.options.max_tokens,
        };

        let reply = post_json(&self.client, &self.endpoint, &body, None).await?;
        text_at(&reply, "/response")
    }

    fn role_map(&self) -> &'static RoleMap {
        &ARGO_ROLES
    }

    fn name(&self) -> &str {
        "argo"
    }
}
