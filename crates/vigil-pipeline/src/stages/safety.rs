//! Safety & escalation stage.
//!
//! Wraps the deterministic rulebook engine and merges its mandated actions
//! ahead of the policy recommendations. This stage always runs once
//! structuring has completed and can never be bypassed by upstream results.

use std::collections::HashSet;
use std::sync::Arc;

use vigil_core::intake::Vitals;
use vigil_core::outputs::{
    ActionSource, EvidenceOutput, NextAction, ReasoningOutput, SafetyOutput,
};
use vigil_core::structured::StructuredIntake;
use vigil_rules::engine::evaluate;
use vigil_rules::types::Rulebook;

/// Fourth pipeline stage: deterministic risk tiering.
pub struct SafetyStage {
    rulebook: Arc<Rulebook>,
}

impl SafetyStage {
    #[must_use]
    pub fn new(rulebook: Arc<Rulebook>) -> Self {
        Self { rulebook }
    }

    /// Run the stage. Returns the safety output and the merged action list
    /// (safety-mandated actions first, then policy actions, duplicate-free).
    #[must_use]
    pub fn run(
        &self,
        structured: &StructuredIntake,
        vitals: &Vitals,
        reasoning: &ReasoningOutput,
        evidence: &EvidenceOutput,
    ) -> (SafetyOutput, Vec<NextAction>) {
        let outcome = evaluate(&self.rulebook, structured, vitals);

        let mut seen: HashSet<&str> = HashSet::new();
        let mut merged: Vec<NextAction> = Vec::new();
        for action in &outcome.mandated_actions {
            if seen.insert(action.as_str()) {
                merged.push(NextAction {
                    action: action.clone(),
                    source: ActionSource::Safety,
                });
            }
        }
        for action in &evidence.recommended_actions_from_policy {
            if seen.insert(action.as_str()) {
                merged.push(NextAction {
                    action: action.clone(),
                    source: ActionSource::Policy,
                });
            }
        }

        let uncertainty_reasons = uncertainty_reasons(structured, vitals, reasoning, &outcome);

        let output = SafetyOutput {
            risk_tier: outcome.risk_tier,
            escalation_required: outcome.escalation_required,
            red_flags: outcome.red_flags,
            safety_triggers: outcome.triggers,
            actions_added_by_safety: outcome.mandated_actions,
            risk_tier_rationale: outcome.rationale,
            risk_scores: outcome.risk_scores,
            uncertainty_reasons,
            safety_rules_version: self.rulebook.version.clone(),
        };
        (output, merged)
    }
}

fn uncertainty_reasons(
    structured: &StructuredIntake,
    vitals: &Vitals,
    reasoning: &ReasoningOutput,
    outcome: &vigil_rules::engine::RuleOutcome,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if !structured.missing_critical_fields.is_empty() {
        reasons.push(format!(
            "Missing intake fields: {}",
            structured.missing_critical_fields.join(", ")
        ));
    }
    if structured.has_symptom("chest_pain") && !vitals.any_present() {
        reasons.push("Cardiopulmonary symptoms reported without any vital signs".to_string());
    }
    if reasoning.reasoning_backend_error.is_some() {
        reasons.push("External reasoning unavailable; deterministic differential used".to_string());
    }
    if let Some(reason) = &reasoning.reasoning_backend_skipped_reason {
        if reason != "backend=deterministic" {
            reasons.push(format!("External reasoning skipped ({reason})"));
        }
    }
    if outcome.risk_scores.shock_index_high
        && outcome.risk_tier != vigil_core::outputs::RiskTier::Critical
    {
        reasons.push("Elevated shock index without corroborating critical findings".to_string());
    }

    reasons
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::outputs::RiskTier;
    use vigil_rules::default_rulebook;

    fn stage() -> SafetyStage {
        SafetyStage::new(Arc::new(default_rulebook()))
    }

    fn structured(symptoms: &[&str]) -> StructuredIntake {
        StructuredIntake {
            symptoms: symptoms.iter().map(|s| (*s).to_string()).collect(),
            ..StructuredIntake::default()
        }
    }

    fn evidence_with(actions: &[&str]) -> EvidenceOutput {
        EvidenceOutput {
            recommended_actions_from_policy: actions.iter().map(|s| (*s).to_string()).collect(),
            ..EvidenceOutput::default()
        }
    }

    #[test]
    fn safety_actions_lead_the_merged_list() {
        let (output, merged) = stage().run(
            &structured(&["chest_pain"]),
            &Vitals {
                heart_rate: Some(100.0),
                systolic_bp: Some(120.0),
                spo2: Some(98.0),
                temperature_c: Some(37.0),
                ..Vitals::default()
            },
            &ReasoningOutput::default(),
            &evidence_with(&["Send serial troponin at 0 and 2 hours"]),
        );
        assert_eq!(merged[0].source, ActionSource::Safety);
        assert!(merged[0].action.contains("ECG"));
        assert!(merged
            .iter()
            .any(|a| a.source == ActionSource::Policy && a.action.contains("troponin")));
        // Every safety action is present in the merged list.
        for action in &output.actions_added_by_safety {
            assert!(merged.iter().any(|a| &a.action == action));
        }
    }

    #[test]
    fn duplicate_policy_action_keeps_safety_provenance() {
        let (_, merged) = stage().run(
            &structured(&["chest_pain"]),
            &Vitals::default(),
            &ReasoningOutput::default(),
            // Identical wording to the safety-mandated ECG action.
            &evidence_with(&["Obtain 12-lead ECG within 10 minutes"]),
        );
        let ecg: Vec<&NextAction> = merged
            .iter()
            .filter(|a| a.action == "Obtain 12-lead ECG within 10 minutes")
            .collect();
        assert_eq!(ecg.len(), 1);
        assert_eq!(ecg[0].source, ActionSource::Safety);
    }

    #[test]
    fn reasoning_cannot_change_the_tier() {
        let optimistic = ReasoningOutput {
            differential_considerations: vec!["Anxiety".into()],
            reasoning_rationale: "benign".into(),
            ..ReasoningOutput::default()
        };
        let (output, _) = stage().run(
            &structured(&["chest_pain"]),
            &Vitals {
                systolic_bp: Some(80.0),
                ..Vitals::default()
            },
            &optimistic,
            &EvidenceOutput::default(),
        );
        assert_eq!(output.risk_tier, RiskTier::Critical);
    }

    #[test]
    fn uncertainty_lists_missing_fields() {
        let mut s = structured(&["chest_pain"]);
        s.missing_critical_fields =
            vec!["vitals.heart_rate".into(), "vitals.systolic_bp".into()];
        let (output, _) = stage().run(
            &s,
            &Vitals::default(),
            &ReasoningOutput::default(),
            &EvidenceOutput::default(),
        );
        assert!(output
            .uncertainty_reasons
            .iter()
            .any(|r| r.contains("vitals.heart_rate")));
        // Chest pain with no vitals at all is a conflicting signal.
        assert!(output
            .uncertainty_reasons
            .iter()
            .any(|r| r.contains("without any vital signs")));
    }

    #[test]
    fn backend_error_recorded_as_uncertainty() {
        let degraded = ReasoningOutput {
            reasoning_backend_error: Some("http_503".into()),
            ..ReasoningOutput::default()
        };
        let (output, _) = stage().run(
            &structured(&[]),
            &Vitals::default(),
            &degraded,
            &EvidenceOutput::default(),
        );
        assert!(output
            .uncertainty_reasons
            .iter()
            .any(|r| r.contains("External reasoning unavailable")));
    }

    #[test]
    fn configured_deterministic_backend_is_not_uncertain() {
        let configured = ReasoningOutput {
            reasoning_backend_skipped_reason: Some("backend=deterministic".into()),
            ..ReasoningOutput::default()
        };
        let (output, _) = stage().run(
            &structured(&[]),
            &Vitals::default(),
            &configured,
            &EvidenceOutput::default(),
        );
        assert!(output.uncertainty_reasons.is_empty());
    }

    #[test]
    fn rules_version_recorded() {
        let (output, _) = stage().run(
            &structured(&[]),
            &Vitals::default(),
            &ReasoningOutput::default(),
            &EvidenceOutput::default(),
        );
        assert_eq!(output.safety_rules_version, vigil_rules::SAFETY_RULES_VERSION);
    }
}
