//! Backend and circuit-breaker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which implementation serves a reasoning or rewrite call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Rule-table output, no I/O.
    #[default]
    Deterministic,
    /// OpenAI-compatible chat-completions endpoint.
    External,
}

/// Configuration for one external backend (reasoning or communication).
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Endpoint base URL; `/v1/chat/completions` is appended.
    pub base_url: String,
    pub model: String,
    /// Opaque bearer token, sent as `Authorization: Bearer ...` when set.
    pub api_key: Option<String>,
    /// Whether to include intake image data URIs in the request.
    pub send_images: bool,
    /// Maximum images transmitted per request.
    pub max_images: usize,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Per-attempt timeout; clamped to the remaining request deadline.
    pub timeout: Duration,
    /// Additional attempts after the first (retryable errors only).
    pub max_retries: u32,
    /// Base backoff between attempts; doubles per attempt.
    pub retry_backoff: Duration,
    /// Refuse external calls when the intake carries PHI hits.
    pub phi_guard: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Deterministic,
            base_url: String::new(),
            model: String::new(),
            api_key: None,
            send_images: false,
            max_images: 2,
            temperature: 0.2,
            max_tokens: 600,
            timeout: Duration::from_secs(30),
            max_retries: 1,
            retry_backoff: Duration::from_millis(500),
            phi_guard: true,
        }
    }
}

impl BackendConfig {
    /// Circuit-breaker key for this endpoint: base URL plus model.
    #[must_use]
    pub fn endpoint_key(&self) -> String {
        format!("{}::{}", self.base_url.trim_end_matches('/'), self.model)
    }

    /// Full chat-completions URL.
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Circuit-breaker tuning, shared by every endpoint in the process.
#[derive(Clone, Copy, Debug)]
pub struct CircuitConfig {
    /// Failures within the window that open the circuit.
    pub failures_threshold: u32,
    /// How long the circuit stays open before a half-open probe.
    pub cooldown: Duration,
    /// Rolling window over which failures are counted.
    pub window: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failures_threshold: 2,
            cooldown: Duration::from_secs(15),
            window: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_key_normalizes_trailing_slash() {
        let config = BackendConfig {
            base_url: "http://localhost:8000/".into(),
            model: "m1".into(),
            ..BackendConfig::default()
        };
        assert_eq!(config.endpoint_key(), "http://localhost:8000::m1");
    }

    #[test]
    fn completions_url_appends_path() {
        let config = BackendConfig {
            base_url: "http://localhost:8000".into(),
            ..BackendConfig::default()
        };
        assert_eq!(
            config.completions_url(),
            "http://localhost:8000/v1/chat/completions"
        );
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = BackendConfig::default();
        assert_eq!(config.kind, BackendKind::Deterministic);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.max_images, 2);
        assert!(config.phi_guard);
        assert_eq!(config.timeout, Duration::from_secs(30));

        let circuit = CircuitConfig::default();
        assert_eq!(circuit.failures_threshold, 2);
        assert_eq!(circuit.cooldown, Duration::from_secs(15));
        assert_eq!(circuit.window, Duration::from_secs(60));
    }
}
