//! Pack-order matcher evaluation.

use vigil_core::intake::Vitals;
use vigil_core::structured::StructuredIntake;

use crate::types::{Policy, PolicyPack};

/// Whether a single policy matches the structured intake.
///
/// Every matcher group that is present must succeed; a policy with no
/// matchers never matches (it would otherwise fire on every request).
#[must_use]
pub fn policy_matches(policy: &Policy, structured: &StructuredIntake, vitals: &Vitals) -> bool {
    let m = &policy.matchers;
    let mut any_group = false;

    if let Some(all_of) = &m.symptoms_all_of {
        any_group = true;
        if !all_of.iter().all(|t| structured.has_symptom(t)) {
            return false;
        }
    }
    if let Some(any_of) = &m.symptoms_any_of {
        any_group = true;
        if !any_of.iter().any(|t| structured.has_symptom(t)) {
            return false;
        }
    }
    if let Some(risks) = &m.risk_factors_any_of {
        any_group = true;
        if !risks.iter().any(|t| structured.has_risk_factor(t)) {
            return false;
        }
    }
    if let Some(vital_preds) = &m.vitals {
        any_group = true;
        if !vital_preds.iter().all(|p| p.holds(vitals)) {
            return false;
        }
    }

    any_group
}

/// Select up to `top_k` matching policies, preserving pack order.
#[must_use]
pub fn select_policies<'a>(
    pack: &'a PolicyPack,
    structured: &StructuredIntake,
    vitals: &Vitals,
    top_k: usize,
) -> Vec<&'a Policy> {
    pack.policies
        .iter()
        .filter(|p| policy_matches(p, structured, vitals))
        .take(top_k)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Matchers, VitalOp, VitalPredicate};

    fn policy(id: &str, matchers: Matchers) -> Policy {
        Policy {
            id: id.into(),
            title: format!("policy {id}"),
            citation: "local protocol".into(),
            matchers,
            recommended_actions: vec![format!("action for {id}")],
        }
    }

    fn structured(symptoms: &[&str], risks: &[&str]) -> StructuredIntake {
        StructuredIntake {
            symptoms: symptoms.iter().map(|s| (*s).to_string()).collect(),
            risk_factors: risks.iter().map(|s| (*s).to_string()).collect(),
            ..StructuredIntake::default()
        }
    }

    #[test]
    fn all_present_groups_must_succeed() {
        let p = policy(
            "combo",
            Matchers {
                symptoms_any_of: Some(vec!["chest_pain".into()]),
                vitals: Some(vec![VitalPredicate {
                    field: "spo2".into(),
                    op: VitalOp::Lt,
                    value: 92.0,
                }]),
                ..Matchers::default()
            },
        );
        let s = structured(&["chest_pain"], &[]);
        let hypoxic = Vitals {
            spo2: Some(90.0),
            ..Vitals::default()
        };
        assert!(policy_matches(&p, &s, &hypoxic));
        assert!(!policy_matches(&p, &s, &Vitals::default()));
    }

    #[test]
    fn empty_matchers_never_match() {
        let p = policy("open", Matchers::default());
        assert!(!policy_matches(
            &p,
            &structured(&["chest_pain"], &[]),
            &Vitals::default()
        ));
    }

    #[test]
    fn selection_preserves_pack_order_and_top_k() {
        let pack = PolicyPack {
            version: "t".into(),
            policies: vec![
                policy(
                    "first",
                    Matchers {
                        symptoms_any_of: Some(vec!["cough".into()]),
                        ..Matchers::default()
                    },
                ),
                policy(
                    "second",
                    Matchers {
                        symptoms_any_of: Some(vec!["fever".into()]),
                        ..Matchers::default()
                    },
                ),
                policy(
                    "third",
                    Matchers {
                        symptoms_any_of: Some(vec!["fever".into()]),
                        ..Matchers::default()
                    },
                ),
            ],
        };
        let s = structured(&["cough", "fever"], &[]);
        let selected = select_policies(&pack, &s, &Vitals::default(), 2);
        let ids: Vec<&str> = selected.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn risk_factor_group() {
        let p = policy(
            "preg",
            Matchers {
                risk_factors_any_of: Some(vec!["pregnancy".into()]),
                ..Matchers::default()
            },
        );
        assert!(policy_matches(&p, &structured(&[], &["pregnancy"]), &Vitals::default()));
        assert!(!policy_matches(&p, &structured(&[], &["diabetes"]), &Vitals::default()));
    }
}
