//! Model adapter
//!
//! Turns the conversation into a request the service accepts, retries
//! transient failures, and parses the reply into an [`Action`].

use std::sync::Arc;

use crate::core::config::{Config, ModelConfig};
use crate::core::{Action, Result, Role, ScribeError, Turn};
use crate::llm::provider::create_provider;
use crate::llm::reply::parse_action;
use crate::llm::retry::RetryPolicy;
use crate::llm::roles::RoleMap;
use crate::llm::traits::{CompletionRequest, GenerateOptions, ModelService, WireMessage};

/// Converts conversations to requests and replies to actions
#[derive(Clone)]
pub struct ModelAdapter {
    service: Arc<dyn ModelService>,
    model: String,
    options: GenerateOptions,
    retry: RetryPolicy,
    max_input_bytes: usize,
}

impl ModelAdapter {
    /// Create an adapter over any service
    pub fn new(service: Arc<dyn ModelService>, config: &ModelConfig) -> Self {
        Self {
            service,
            model: config.model.clone(),
            options: GenerateOptions {
                temperature: Some(config.temperature),
                top_p: Some(config.top_p),
                max_tokens: Some(config.max_completion_tokens),
            },
            retry: RetryPolicy::from_config(config),
            max_input_bytes: config.max_input_bytes,
        }
    }

    /// Create an adapter for the configured service
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(create_provider(config)?, &config.model))
    }

    /// Replace the retry schedule
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the request size ceiling
    pub fn with_max_input_bytes(mut self, max: usize) -> Self {
        self.max_input_bytes = max;
        self
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    /// Ask the model what to do next.
    ///
    /// A reply with an unparseable action block comes back as
    /// `ScribeError::Validation`; every other error is fatal to the run.
    pub async fn next_action(&self, turns: &[Turn]) -> Result<Action> {
        let messages = self.build_messages(turns);
        let reply = self.complete_with_retry(&messages).await?;
        Ok(parse_action(&reply)?)
    }

    /// Map roles and fit the request under the size ceiling
    pub fn build_messages(&self, turns: &[Turn]) -> Vec<WireMessage> {
        fit_to_limit(turns, self.service.role_map(), self.max_input_bytes)
    }

    async fn complete_with_retry(&self, messages: &[WireMessage]) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            options: &self.options,
        };

        let mut last_error = String::new();
        for attempt in 1..=self.retry.max_attempts {
            tracing::debug!(
                attempt,
                max_attempts = self.retry.max_attempts,
                messages = messages.len(),
                "Requesting model reply"
            );

            match self.service.complete(&request).await {
                Ok(text) if !text.trim().is_empty() => return Ok(text),
                Ok(_) => last_error = "empty reply".to_string(),
                Err(e) if e.is_retryable() => last_error = e.to_string(),
                Err(e) => {
                    tracing::warn!(error = %e, "Model request failed, not retrying");
                    return Err(e);
                }
            }

            if attempt < self.retry.max_attempts {
                let delay = self.retry.delay_after(attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %last_error,
                    "Model request failed, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }

        tracing::error!(attempts = self.retry.max_attempts, error = %last_error, "Model unavailable");
        Err(ScribeError::ModelUnavailable {
            attempts: self.retry.max_attempts,
            last_error,
        })
    }
}

/// Map turns and drop the oldest droppable ones until the request fits.
///
/// System turns and the first user turn (the task) are never dropped, and
/// neither is the newest turn. Dropped turns are replaced by one note.
pub fn fit_to_limit(turns: &[Turn], roles: &RoleMap, max_bytes: usize) -> Vec<WireMessage> {
    let messages = roles.to_wire_all(turns);
    let sizes: Vec<usize> = messages.iter().map(message_size).collect();
    let total: usize = sizes.iter().sum();
    if total <= max_bytes {
        return messages;
    }

    let task_index = turns.iter().position(|t| t.role == Role::User);
    let last = turns.len().saturating_sub(1);
    let protected = |i: usize| turns[i].role == Role::System || Some(i) == task_index || i == last;

    let mut keep = vec![true; turns.len()];
    let mut dropped = 0usize;
    let mut size = total + NOTE_OVERHEAD;
    for i in 0..turns.len() {
        if size <= max_bytes {
            break;
        }
        if protected(i) {
            continue;
        }
        keep[i] = false;
        dropped += 1;
        size -= sizes[i];
    }

    // An observation whose call was dropped reads as noise.
    if let Some(i) = (0..turns.len()).find(|&i| keep[i] && !protected(i)) {
        if turns[i].role == Role::Observation && i > 0 && !keep[i - 1] {
            keep[i] = false;
            dropped += 1;
            size -= sizes[i];
        }
    }

    if dropped == 0 {
        return messages;
    }
    if size > max_bytes {
        tracing::warn!(size, max_bytes, "Request still exceeds the input limit after trimming");
    }
    tracing::info!(dropped, "Omitted oldest turns to fit the model input limit");

    let note = WireMessage::new(
        roles.user,
        format!(
            "[{} earlier turn(s) omitted to fit the model's input limit]",
            dropped
        ),
    );

    let mut out = Vec::with_capacity(messages.len() - dropped + 1);
    let mut note_pending = true;
    for (i, message) in messages.into_iter().enumerate() {
        if !keep[i] {
            continue;
        }
        let prefix = turns[i].role == Role::System || Some(i) == task_index;
        if note_pending && !prefix {
            out.push(note.clone());
            note_pending = false;
        }
        out.push(message);
    }
    out
}

const NOTE_OVERHEAD: usize = 96;

fn message_size(message: &WireMessage) -> usize {
    serde_json::to_string(message)
        .map(|s| s.len())
        .unwrap_or(message.content.len())
}
