//! Adapter error taxonomy.

/// Errors raised by the external adapter. Never crosses the orchestrator
/// boundary: stages convert these into typed output fields and fall back.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// HTTP transport failure (connect, DNS, timeout at the socket level).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint returned a non-success status.
    #[error("HTTP {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        message: String,
        /// Whether the status permits a retry (429 or 5xx).
        retryable: bool,
    },

    /// The response content failed JSON extraction or shape validation.
    #[error("invalid_json: {message}")]
    InvalidJson {
        /// What was wrong with the payload.
        message: String,
    },

    /// The circuit breaker is open for this endpoint.
    #[error("circuit open ({remaining_ms}ms remaining)")]
    CircuitOpen {
        /// Cooldown remaining in milliseconds.
        remaining_ms: u64,
    },

    /// The intake carries PHI hits and the guard refused the call.
    #[error("phi guard refused external call")]
    PhiGuard,

    /// The request deadline expired before an attempt could complete.
    #[error("deadline exceeded")]
    Timeout,

    /// The caller cancelled the request.
    #[error("cancelled")]
    Cancelled,
}

impl BackendError {
    /// Whether a retry may succeed. Only transport failures and 429/5xx.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { retryable, .. } => *retryable,
            Self::InvalidJson { .. }
            | Self::CircuitOpen { .. }
            | Self::PhiGuard
            | Self::Timeout
            | Self::Cancelled => false,
        }
    }

    /// Skip reason for the `*_backend_skipped_reason` field, when the call
    /// was never attempted.
    #[must_use]
    pub fn skip_reason(&self) -> Option<&'static str> {
        match self {
            Self::CircuitOpen { .. } => Some("circuit_open"),
            Self::PhiGuard => Some("phi_guard"),
            _ => None,
        }
    }

    /// Stable label for the `*_backend_error` field.
    #[must_use]
    pub fn wire_label(&self) -> String {
        match self {
            Self::InvalidJson { .. } => "invalid_json".to_string(),
            Self::Cancelled => "cancelled".to_string(),
            Self::Timeout => "timeout".to_string(),
            Self::Api { status, .. } => format!("http_{status}"),
            Self::Http(e) => format!("transport: {e}"),
            Self::CircuitOpen { .. } => "circuit_open".to_string(),
            Self::PhiGuard => "phi_guard".to_string(),
        }
    }
}
