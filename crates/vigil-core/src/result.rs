//! Trace entries and the aggregated triage result.

use serde::{Deserialize, Serialize};

use crate::outputs::{
    CommunicationOutput, EvidenceOutput, NextAction, ReasoningOutput, RiskTier, SafetyOutput,
};
use crate::structured::StructuredIntake;

/// Fixed stage names, in execution order. The trace always carries exactly
/// these five entries.
pub const STAGE_NAMES: [&str; 5] = [
    "intake_structuring",
    "multimodal_reasoning",
    "evidence_policy",
    "safety_escalation",
    "communication",
];

/// Tagged union of the five stage outputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageOutput {
    Structuring(StructuredIntake),
    Reasoning(ReasoningOutput),
    Evidence(EvidenceOutput),
    Safety(SafetyOutput),
    Communication(CommunicationOutput),
}

/// One per-stage audit record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Stage name (one of [`STAGE_NAMES`]).
    pub agent: String,
    /// Wall-clock stage duration in milliseconds.
    pub latency_ms: u64,
    /// The stage's (possibly degraded) output.
    pub output: StageOutput,
    /// Set when the stage errored or was cancelled; the output is then a
    /// best-effort default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Final aggregated triage recommendation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    pub request_id: String,
    /// ISO-8601 UTC creation timestamp.
    pub created_at: String,
    pub pipeline_version: String,
    pub total_latency_ms: u64,
    /// Deterministic coverage-based confidence, 0..1.
    pub confidence: f64,
    /// Merged safety + policy actions, safety first, duplicate-free.
    pub recommended_next_actions: Vec<NextAction>,
    pub red_flags: Vec<String>,
    pub risk_tier: RiskTier,
    pub escalation_required: bool,
    pub differential_considerations: Vec<String>,
    pub clinician_handoff: String,
    pub patient_summary: String,
    pub uncertainty_reasons: Vec<String>,
    /// Exactly five entries, one per stage, in execution order.
    pub trace: Vec<TraceEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_output_serializes_flat() {
        let entry = TraceEntry {
            agent: "intake_structuring".into(),
            latency_ms: 3,
            output: StageOutput::Structuring(StructuredIntake {
                normalized_summary: "CC: cough".into(),
                symptoms: vec!["cough".into()],
                ..StructuredIntake::default()
            }),
            error: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        // Untagged: the output record's fields sit directly under "output".
        assert_eq!(json["output"]["symptoms"][0], "cough");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn stage_names_fixed_order() {
        assert_eq!(STAGE_NAMES[0], "intake_structuring");
        assert_eq!(STAGE_NAMES[3], "safety_escalation");
        assert_eq!(STAGE_NAMES.len(), 5);
    }
}
