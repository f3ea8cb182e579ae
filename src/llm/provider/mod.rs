//! Model service implementations and factory
//!
//! Submodules implement specific services (Argo, Ollama, OpenAI-compatible).
//! They share one HTTP client setup and one status classification.

pub mod argo;
pub mod ollama;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::core::config::{Config, ModelConfig, ProviderType};
use crate::core::{Result, ScribeError};
use crate::llm::traits::ModelService;

pub use argo::ArgoClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

/// Create a model service based on configuration
pub fn create_provider(config: &Config) -> Result<Arc<dyn ModelService>> {
    let model = &config.model;
    let provider: Arc<dyn ModelService> = match model.provider {
        ProviderType::Argo => Arc::new(ArgoClient::from_config(model)?),
        ProviderType::Ollama => Arc::new(OllamaClient::from_config(model)?),
        ProviderType::OpenAi => Arc::new(OpenAiClient::from_config(model)?),
    };
    tracing::debug!(provider = provider.name(), model = %model.model, "Model service ready");
    Ok(provider)
}

/// HTTP client with the model request timeout applied
pub(crate) fn http_client(config: &ModelConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ScribeError::config(format!("Failed to create HTTP client: {}", e)))
}

/// POST a JSON body and return the parsed JSON reply
pub(crate) async fn post_json<B: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    body: &B,
    bearer: Option<&str>,
) -> Result<serde_json::Value> {
    let mut request = client.post(url).json(body);
    if let Some(key) = bearer {
        request = request.bearer_auth(key);
    }

    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(classify_status(status, text));
    }

    serde_json::from_str(&text).map_err(|e| {
        ScribeError::transient(format!("malformed response body ({}): {}", e, preview(&text)))
    })
}

/// Server-side and throttling statuses are retried; other refusals are final
fn classify_status(status: StatusCode, body: String) -> ScribeError {
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        ScribeError::transient(format!("HTTP {}: {}", status.as_u16(), preview(&body)))
    } else {
        ScribeError::ModelRejected {
            status: status.as_u16(),
            body: preview(&body),
        }
    }
}

/// Extract a string at a JSON pointer or report a malformed reply
pub(crate) fn text_at(value: &serde_json::Value, pointer: &str) -> Result<String> {
    value
        .pointer(pointer)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            ScribeError::transient(format!(
                "malformed response: missing '{}' in {}",
                pointer,
                preview(&value.to_string())
            ))
        })
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 500;
    if text.len() <= LIMIT {
        return text.to_string();
    }
    let mut end = LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert!(classify_status(StatusCode::BAD_GATEWAY, String::new()).is_retryable());
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()).is_retryable());
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "bad key".into()),
            ScribeError::ModelRejected { status: 401, .. }
        ));
    }

    #[test]
    fn test_text_at() {
        let value = serde_json::json!({"choices": [{"message": {"content": "hi"}}]});
        assert_eq!(text_at(&value, "/choices/0/message/content").unwrap(), "hi");
        assert!(text_at(&value, "/response").unwrap_err().is_retryable());
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        let text = "é".repeat(400);
        assert!(preview(&text).ends_with("..."));
    }
}
