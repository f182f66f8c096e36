//! Untrusted intake types and entry-point validation.
//!
//! The intake is parsed from caller-supplied JSON. Unknown fields are
//! ignored; absent vitals mean "unknown", never a sentinel value. Schema
//! validation happens once here; downstream stages trust these types.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{IntakeInvalidReason, TriageError};

static IMAGE_DATA_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^data:image/[a-zA-Z+.-]+;base64,").unwrap());

/// Structured vital signs. Every field is optional; absent means unknown.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vitals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub systolic_bp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diastolic_bp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spo2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<f64>,
}

impl Vitals {
    /// Whether any vital sign was recorded.
    #[must_use]
    pub fn any_present(&self) -> bool {
        self.heart_rate.is_some()
            || self.systolic_bp.is_some()
            || self.diastolic_bp.is_some()
            || self.temperature_c.is_some()
            || self.spo2.is_some()
            || self.respiratory_rate.is_some()
    }
}

/// Patient demographics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Demographics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
}

/// Raw patient intake as submitted by the caller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intake {
    pub chief_complaint: String,
    pub history: String,
    pub demographics: Demographics,
    pub vitals: Vitals,
    pub image_descriptions: Vec<String>,
    pub image_data_urls: Vec<String>,
    pub prior_notes: Vec<String>,
}

impl Intake {
    /// Parse and validate an intake from raw JSON bytes.
    ///
    /// Enforces the payload size limit, JSON shape, a non-empty chief
    /// complaint, and the image data-URI format.
    pub fn from_json_slice(bytes: &[u8], max_bytes: usize) -> Result<Self, TriageError> {
        if bytes.len() > max_bytes {
            return Err(TriageError::IntakeInvalid {
                reason: IntakeInvalidReason::PayloadTooLarge,
            });
        }
        let intake: Self =
            serde_json::from_slice(bytes).map_err(|_| TriageError::IntakeInvalid {
                reason: IntakeInvalidReason::InvalidJson,
            })?;
        intake.validate()?;
        Ok(intake)
    }

    /// Validate an already-parsed intake.
    pub fn validate(&self) -> Result<(), TriageError> {
        if self.chief_complaint.trim().is_empty() {
            return Err(TriageError::IntakeInvalid {
                reason: IntakeInvalidReason::MissingChiefComplaint,
            });
        }
        for url in &self.image_data_urls {
            if !IMAGE_DATA_URL.is_match(url) {
                return Err(TriageError::IntakeInvalid {
                    reason: IntakeInvalidReason::InvalidImageDataUrl,
                });
            }
        }
        Ok(())
    }

    /// Concatenate the free-text sections for matching, in stable order:
    /// chief complaint, history, prior notes, image descriptions.
    #[must_use]
    pub fn combined_text(&self) -> String {
        let mut sections: Vec<&str> = vec![&self.chief_complaint, &self.history];
        sections.extend(self.prior_notes.iter().map(String::as_str));
        sections.extend(self.image_descriptions.iter().map(String::as_str));
        sections
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
