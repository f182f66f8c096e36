//! Settings types.
//!
//! JSON keys are snake_case and mirror the documented configuration surface
//! (`reasoning.*`, `communication.*`, `circuit.*`, `policy.*`,
//! `phi_guard.*`, `request.*`). Every field has a default so a missing or
//! partial settings file is always valid.

use serde::{Deserialize, Serialize};

/// Backend selection for reasoning or communication.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    #[default]
    Deterministic,
    External,
}

/// One external-backend section (`reasoning` or `communication`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub backend: BackendChoice,
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub temperature: f64,
    pub max_tokens: u32,
    pub send_images: bool,
    pub max_images: usize,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            backend: BackendChoice::Deterministic,
            base_url: String::new(),
            model: String::new(),
            api_key: None,
            timeout_ms: 30_000,
            max_retries: 1,
            retry_backoff_ms: 500,
            temperature: 0.2,
            max_tokens: 600,
            send_images: false,
            max_images: 2,
        }
    }
}

/// Circuit-breaker settings shared by every endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitSettings {
    pub failures_threshold: u32,
    pub cooldown_ms: u64,
    pub window_ms: u64,
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self {
            failures_threshold: 2,
            cooldown_ms: 15_000,
            window_ms: 60_000,
        }
    }
}

/// Policy pack settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    /// Path to the pack file; the embedded default is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pack_path: Option<String>,
    /// Maximum matching policies selected per request.
    pub top_k: usize,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            pack_path: None,
            top_k: 2,
        }
    }
}

/// PHI guard settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhiGuardSettings {
    pub enabled: bool,
}

impl Default for PhiGuardSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Per-request limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSettings {
    /// Maximum intake payload size in bytes.
    pub max_bytes: usize,
    /// Overall pipeline deadline in milliseconds.
    pub deadline_ms: u64,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            max_bytes: 256 * 1024,
            deadline_ms: 5_000,
        }
    }
}

/// Root settings record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageSettings {
    pub reasoning: BackendSettings,
    pub communication: BackendSettings,
    pub circuit: CircuitSettings,
    pub policy: PolicySettings,
    pub phi_guard: PhiGuardSettings,
    pub request: RequestSettings,
}
