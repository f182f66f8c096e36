//! OpenAI-compatible chat-completions client.
//!
//! One shared, connection-pooled `reqwest::Client` serves every request in
//! the process. Each call acquires the circuit breaker, then attempts the
//! request with a per-attempt timeout clamped to the remaining request
//! deadline. Retries apply to network errors and HTTP 5xx/429 only, with
//! doubling backoff, and abort immediately on cancellation.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::circuit::{CircuitDecision, CircuitRegistry};
use crate::config::BackendConfig;
use crate::errors::BackendError;

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

/// One chat message.
#[derive(Clone, Debug, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: MessageContent,
}

impl ChatMessage {
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: MessageContent::Text(text.into()),
        }
    }

    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: MessageContent::Text(text.into()),
        }
    }

    /// Multimodal user message (text plus image data URIs).
    #[must_use]
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: "user",
            content: MessageContent::Parts(parts),
        }
    }
}

/// Plain-text or multimodal message content.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One element of a multimodal content array.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrlRef },
}

/// Image reference carried as a data URI.
#[derive(Clone, Debug, Serialize)]
pub struct ImageUrlRef {
    pub url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
    /// Some servers return `text` instead of a message object.
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Shared chat-completions client with circuit-breaker integration.
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    circuits: Arc<CircuitRegistry>,
}

impl ChatClient {
    #[must_use]
    pub fn new(http: reqwest::Client, circuits: Arc<CircuitRegistry>) -> Self {
        Self { http, circuits }
    }

    /// Run one chat completion and return the raw content string.
    ///
    /// The circuit breaker is consulted before any network activity; its
    /// state is updated once per call (not per attempt). Cancellation
    /// releases a half-open probe slot without recording an outcome.
    pub async fn complete(
        &self,
        config: &BackendConfig,
        messages: &[ChatMessage],
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<String, BackendError> {
        let key = config.endpoint_key();
        let half_open = match self.circuits.try_acquire(&key) {
            CircuitDecision::Open { remaining } => {
                return Err(BackendError::CircuitOpen {
                    remaining_ms: u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
                });
            }
            CircuitDecision::HalfOpen => true,
            CircuitDecision::Closed => false,
        };

        let mut attempt: u32 = 0;
        let result = loop {
            if cancel.is_cancelled() {
                break Err(BackendError::Cancelled);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break Err(BackendError::Timeout);
            }
            let attempt_timeout = config.timeout.min(remaining);

            let outcome = tokio::select! {
                resp = self.send_once(config, messages, attempt_timeout) => resp,
                () = cancel.cancelled() => Err(BackendError::Cancelled),
            };

            match outcome {
                Ok(content) => break Ok(content),
                Err(BackendError::Cancelled) => break Err(BackendError::Cancelled),
                Err(err) if err.is_retryable() && attempt < config.max_retries => {
                    attempt += 1;
                    metrics::counter!("backend_retries_total").increment(1);
                    debug!(attempt, error = %err, "retrying backend call");
                    let backoff = config.retry_backoff * 2u32.saturating_pow(attempt - 1);
                    tokio::select! {
                        () = tokio::time::sleep(backoff) => {}
                        () = cancel.cancelled() => break Err(BackendError::Cancelled),
                    }
                }
                Err(err) => break Err(err),
            }
        };

        match &result {
            Ok(_) => self.circuits.record_success(&key),
            Err(BackendError::Cancelled) => {
                if half_open {
                    self.circuits.release(&key);
                }
            }
            Err(_) => self.circuits.record_failure(&key),
        }
        result
    }

    async fn send_once(
        &self,
        config: &BackendConfig,
        messages: &[ChatMessage],
        timeout: std::time::Duration,
    ) -> Result<String, BackendError> {
        let request = ChatRequest {
            model: &config.model,
            messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        let mut builder = self
            .http
            .post(config.completions_url())
            .timeout(timeout)
            .json(&request);
        if let Some(api_key) = &config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message: String = body.chars().take(500).collect();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
                retryable: status.as_u16() == 429 || status.is_server_error(),
            });
        }

        let payload: ChatResponse = response.json().await.map_err(|_| {
            BackendError::InvalidJson {
                message: "unexpected completion envelope".into(),
            }
        })?;

        let content = payload
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.and_then(|m| m.content).or(c.text))
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(BackendError::InvalidJson {
                message: "empty completion content".into(),
            });
        }
        Ok(content)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
