//! Caller-visible error taxonomy.
//!
//! Only three errors ever cross the pipeline boundary: invalid intake,
//! cancellation before the safety stage, and unexpected internal failures.
//! Everything else degrades in-band and is observable in the trace.

use serde::{Deserialize, Serialize};

/// Machine-readable reason codes for rejected intakes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeInvalidReason {
    /// Request body exceeded the configured byte limit.
    PayloadTooLarge,
    /// Request body was not valid JSON.
    InvalidJson,
    /// `chief_complaint` missing or empty after trimming.
    MissingChiefComplaint,
    /// An `image_data_urls` entry is not a base64 image data URI.
    InvalidImageDataUrl,
}

impl IntakeInvalidReason {
    /// Wire-format reason code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PayloadTooLarge => "payload_too_large",
            Self::InvalidJson => "invalid_json",
            Self::MissingChiefComplaint => "missing_chief_complaint",
            Self::InvalidImageDataUrl => "invalid_image_data_url",
        }
    }
}

impl std::fmt::Display for IntakeInvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced to the pipeline caller.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    /// The intake failed entry-point validation. Recoverable by the caller.
    #[error("invalid intake: {reason}")]
    IntakeInvalid {
        /// Machine-readable reason code.
        reason: IntakeInvalidReason,
    },

    /// The request was cancelled before the safety stage completed.
    #[error("request cancelled")]
    Cancelled,

    /// Unexpected internal failure. Should be rare since stages degrade.
    #[error("internal error: {message}")]
    Internal {
        /// Error description.
        message: String,
    },
}

impl TriageError {
    /// Stable error code for wire responses.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::IntakeInvalid { .. } => "intake_invalid",
            Self::Cancelled => "cancelled",
            Self::Internal { .. } => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_are_snake_case() {
        assert_eq!(IntakeInvalidReason::PayloadTooLarge.as_str(), "payload_too_large");
        assert_eq!(
            IntakeInvalidReason::MissingChiefComplaint.as_str(),
            "missing_chief_complaint"
        );
    }

    #[test]
    fn error_codes_stable() {
        let err = TriageError::IntakeInvalid {
            reason: IntakeInvalidReason::InvalidJson,
        };
        assert_eq!(err.code(), "intake_invalid");
        assert_eq!(TriageError::Cancelled.code(), "cancelled");
    }

    #[test]
    fn reason_serde_roundtrip() {
        let json = serde_json::to_string(&IntakeInvalidReason::InvalidImageDataUrl).unwrap();
        assert_eq!(json, "\"invalid_image_data_url\"");
        let back: IntakeInvalidReason = serde_json::from_str(&json).unwrap();
        assert_eq!(back, IntakeInvalidReason::InvalidImageDataUrl);
    }
}
