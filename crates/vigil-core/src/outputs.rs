//! Per-stage output records.
//!
//! Each stage returns a fresh record; nothing here is mutated in place.
//! Field names are the wire format; do not rename without versioning the
//! pipeline.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Shared enums
// ─────────────────────────────────────────────────────────────────────────────

/// Disposition urgency tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    #[default]
    Routine,
    Urgent,
    Critical,
}

impl RiskTier {
    /// Numeric rank for comparisons (`routine` < `urgent` < `critical`).
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Routine => 0,
            Self::Urgent => 1,
            Self::Critical => 2,
        }
    }

    /// Whether this tier requires escalation.
    #[must_use]
    pub fn requires_escalation(self) -> bool {
        matches!(self, Self::Urgent | Self::Critical)
    }

    /// Wire-format name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Routine => "routine",
            Self::Urgent => "urgent",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a safety trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSeverity {
    Critical,
    Urgent,
    Info,
}

impl TriggerSeverity {
    /// Tier implied by this severity alone.
    #[must_use]
    pub fn implied_tier(self) -> RiskTier {
        match self {
            Self::Critical => RiskTier::Critical,
            Self::Urgent => RiskTier::Urgent,
            Self::Info => RiskTier::Routine,
        }
    }
}

/// Which backend produced a reasoning or communication artifact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningBackend {
    #[default]
    Deterministic,
    External,
}

/// Provenance of a recommended action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionSource {
    /// Mandated by a fired safety trigger. Always listed first.
    Safety,
    /// Drawn from a matched policy.
    Policy,
}

/// One recommended next action with provenance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextAction {
    pub action: String,
    pub source: ActionSource,
}

// ─────────────────────────────────────────────────────────────────────────────
// Stage outputs
// ─────────────────────────────────────────────────────────────────────────────

/// Output of the multimodal clinical-reasoning stage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasoningOutput {
    /// Ranked differential, 1..6 short entries.
    pub differential_considerations: Vec<String>,
    /// One-paragraph rationale.
    pub reasoning_rationale: String,
    pub reasoning_backend: ReasoningBackend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_backend_model: Option<String>,
    pub reasoning_prompt_version: String,
    /// Number of image references on the intake.
    pub images_present: u32,
    /// Number of images actually transmitted externally.
    pub images_sent: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_backend_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_backend_skipped_reason: Option<String>,
}

/// One cited protocol snippet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolCitation {
    pub policy_id: String,
    pub title: String,
    pub citation: String,
    pub recommended_actions: Vec<String>,
}

/// Output of the evidence & policy stage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceOutput {
    /// Deduplicated, in-order actions from the selected policies.
    pub recommended_actions_from_policy: Vec<String>,
    pub protocol_citations: Vec<ProtocolCitation>,
    /// SHA-256 (hex) of the canonicalized policy pack.
    pub policy_pack_sha256: String,
    /// Where the pack was loaded from (path or `embedded`).
    pub policy_pack_source: String,
}

/// One fired safety trigger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyTrigger {
    pub id: String,
    pub label: String,
    pub severity: TriggerSeverity,
    pub detail: String,
}

/// Interpretable risk scores.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskScores {
    /// Heart rate / systolic BP, rounded to two decimals. Absent when either
    /// vital is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shock_index: Option<f64>,
    pub shock_index_high: bool,
    /// 0..3.
    pub qsofa: u8,
    pub qsofa_high_risk: bool,
}

/// Output of the safety & escalation stage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyOutput {
    pub risk_tier: RiskTier,
    pub escalation_required: bool,
    pub red_flags: Vec<String>,
    pub safety_triggers: Vec<SafetyTrigger>,
    /// Safety-mandated actions present in the final merged list.
    pub actions_added_by_safety: Vec<String>,
    /// One sentence naming the dominant trigger(s).
    pub risk_tier_rationale: String,
    pub risk_scores: RiskScores,
    pub uncertainty_reasons: Vec<String>,
    pub safety_rules_version: String,
}

/// Output of the communication stage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunicationOutput {
    /// SBAR-formatted clinician handoff.
    pub clinician_handoff: String,
    /// Plain-language patient summary with return precautions.
    pub patient_summary: String,
    pub communication_backend: ReasoningBackend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication_backend_model: Option<String>,
    pub communication_prompt_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication_backend_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication_backend_skipped_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering() {
        assert!(RiskTier::Critical.rank() > RiskTier::Urgent.rank());
        assert!(RiskTier::Urgent.rank() > RiskTier::Routine.rank());
    }

    #[test]
    fn tier_escalation_rule() {
        assert!(!RiskTier::Routine.requires_escalation());
        assert!(RiskTier::Urgent.requires_escalation());
        assert!(RiskTier::Critical.requires_escalation());
    }

    #[test]
    fn tier_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RiskTier::Critical).unwrap(), "\"critical\"");
    }

    #[test]
    fn action_source_serializes_uppercase() {
        let action = NextAction {
            action: "Obtain 12-lead ECG".into(),
            source: ActionSource::Safety,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["source"], "SAFETY");
    }

    #[test]
    fn optional_backend_fields_omitted_when_absent() {
        let output = ReasoningOutput {
            reasoning_prompt_version: "v1".into(),
            ..ReasoningOutput::default()
        };
        let json = serde_json::to_value(&output).unwrap();
        assert!(json.get("reasoning_backend_error").is_none());
        assert!(json.get("reasoning_backend_model").is_none());
        assert_eq!(json["reasoning_backend"], "deterministic");
    }
}
