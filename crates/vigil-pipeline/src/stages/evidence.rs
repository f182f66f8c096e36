//! Evidence & policy stage.
//!
//! Matches the loaded policy pack against the structured intake and selects
//! up to `top_k` policies in pack order. Never errors at request time: an
//! empty match yields no citations and no actions.

use std::sync::Arc;

use vigil_core::intake::Vitals;
use vigil_core::outputs::{EvidenceOutput, ProtocolCitation};
use vigil_core::structured::StructuredIntake;
use vigil_core::text::dedupe;
use vigil_policy::{select_policies, PolicySnapshot};

/// Third pipeline stage: ground recommendations in the policy pack.
pub struct EvidenceStage {
    snapshot: Arc<PolicySnapshot>,
    top_k: usize,
}

impl EvidenceStage {
    #[must_use]
    pub fn new(snapshot: Arc<PolicySnapshot>, top_k: usize) -> Self {
        Self { snapshot, top_k }
    }

    /// Run the stage.
    #[must_use]
    pub fn run(&self, structured: &StructuredIntake, vitals: &Vitals) -> EvidenceOutput {
        let selected = select_policies(self.snapshot.pack(), structured, vitals, self.top_k);

        let recommended_actions_from_policy = dedupe(
            selected
                .iter()
                .flat_map(|p| p.recommended_actions.iter().cloned()),
        );
        let protocol_citations = selected
            .iter()
            .map(|p| ProtocolCitation {
                policy_id: p.id.clone(),
                title: p.title.clone(),
                citation: p.citation.clone(),
                recommended_actions: p.recommended_actions.clone(),
            })
            .collect();

        EvidenceOutput {
            recommended_actions_from_policy,
            protocol_citations,
            policy_pack_sha256: self.snapshot.sha256().to_string(),
            policy_pack_source: self.snapshot.source().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_policy::load_embedded;

    fn stage() -> EvidenceStage {
        EvidenceStage::new(Arc::new(load_embedded().unwrap()), 2)
    }

    fn structured(symptoms: &[&str]) -> StructuredIntake {
        StructuredIntake {
            symptoms: symptoms.iter().map(|s| (*s).to_string()).collect(),
            ..StructuredIntake::default()
        }
    }

    #[test]
    fn chest_pain_matches_acs_policy() {
        let output = stage().run(&structured(&["chest_pain"]), &Vitals::default());
        assert_eq!(output.protocol_citations[0].policy_id, "acs-early-management");
        assert!(output
            .recommended_actions_from_policy
            .iter()
            .any(|a| a.contains("ECG")));
        assert_eq!(output.policy_pack_sha256.len(), 64);
        assert_eq!(output.policy_pack_source, "embedded");
    }

    #[test]
    fn top_k_limits_citations() {
        // Chest pain + hypoxemia + stroke signs could match three policies.
        let vitals = Vitals {
            spo2: Some(88.0),
            ..Vitals::default()
        };
        let output = stage().run(&structured(&["chest_pain", "slurred_speech"]), &vitals);
        assert_eq!(output.protocol_citations.len(), 2);
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let output = stage().run(&structured(&[]), &Vitals::default());
        assert!(output.protocol_citations.is_empty());
        assert!(output.recommended_actions_from_policy.is_empty());
        // The hash is still reported for the audit trail.
        assert_eq!(output.policy_pack_sha256.len(), 64);
    }

    #[test]
    fn actions_deduplicated_in_order() {
        let vitals = Vitals {
            temperature_c: Some(39.8),
            ..Vitals::default()
        };
        let output = stage().run(&structured(&["fever", "cough"]), &vitals);
        let unique: std::collections::HashSet<&String> =
            output.recommended_actions_from_policy.iter().collect();
        assert_eq!(unique.len(), output.recommended_actions_from_policy.len());
    }
}
