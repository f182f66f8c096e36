//! Structured intake produced by the first pipeline stage.

use serde::{Deserialize, Serialize};

/// Deterministic, normalized view of an [`crate::Intake`].
///
/// Token lists follow catalog declaration order; warning and hit lists are
/// deduplicated and insertion-ordered.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredIntake {
    /// Compact single-line summary for prompts and logs.
    pub normalized_summary: String,
    /// Canonical symptom tokens.
    pub symptoms: Vec<String>,
    /// Canonical risk-factor tokens.
    pub risk_factors: Vec<String>,
    /// Ordered subset of `{chief_complaint, vitals.*}` that is absent but
    /// required for the presenting symptoms.
    pub missing_critical_fields: Vec<String>,
    /// Human-readable input-quality warnings.
    pub data_quality_warnings: Vec<String>,
    /// `field:pattern_name` pairs from the PHI scan. Never raw matches.
    pub phi_hits: Vec<String>,
}

impl StructuredIntake {
    /// Whether a symptom token was extracted.
    #[must_use]
    pub fn has_symptom(&self, token: &str) -> bool {
        self.symptoms.iter().any(|s| s == token)
    }

    /// Whether a risk-factor token was extracted.
    #[must_use]
    pub fn has_risk_factor(&self, token: &str) -> bool {
        self.risk_factors.iter().any(|s| s == token)
    }
}
