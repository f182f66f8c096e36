//! Built-in safety rulebook.
//!
//! Defines the canonical trigger set, the symptom red-flag phrases, and the
//! vitals thresholds. Trigger declaration order is evaluation order and
//! therefore also mandated-action injection order.
//!
//! ## Triggers
//! - `cardiopulmonary_red_flag` — chest pain (urgent)
//! - `stroke_red_flag` — stroke signs (urgent; critical at two or more signs)
//! - `hypoxemia` — SpO2 < 92 (urgent; critical below 88)
//! - `hypotension` — SBP < 90 (critical)
//! - `tachycardia_severe` — HR >= 130 (urgent)
//! - `fever_sepsis` — Temp >= 39.5 (urgent; critical with severe tachycardia)
//! - `hemodynamic_combo` — SpO2 < 92 with chest pain (critical)
//! - `pregnancy_bleeding` — pregnancy with vaginal bleeding (urgent)
//! - `gi_bleed` — hematemesis or melena (urgent)
//! - `syncope` — syncope (urgent)
//!
//! The engine adds `multi_category`, `shock_index_high`, and `qsofa_high`
//! on top of these (see [`crate::engine`]).

use vigil_core::outputs::TriggerSeverity;

use crate::types::{
    CmpOp, Precondition, RedFlagMapping, Rulebook, TriggerDef, VitalField, VitalsThresholds,
};

/// Version recorded on every safety output produced from this rulebook.
pub const SAFETY_RULES_VERSION: &str = "2026-05.r2";

/// Default word-window for negation suppression during intake structuring.
pub const DEFAULT_NEGATION_WINDOW: usize = 4;

/// Build the built-in rulebook.
#[must_use]
pub fn default_rulebook() -> Rulebook {
    Rulebook {
        version: SAFETY_RULES_VERSION.to_string(),
        negation_window: DEFAULT_NEGATION_WINDOW,
        triggers: vec![
            cardiopulmonary_red_flag(),
            stroke_red_flag(),
            hypoxemia(),
            hypotension(),
            tachycardia_severe(),
            fever_sepsis(),
            hemodynamic_combo(),
            pregnancy_bleeding(),
            gi_bleed(),
            syncope(),
        ],
        red_flags: red_flag_mappings(),
        thresholds: VitalsThresholds {
            spo2_urgent: 92.0,
            sbp_critical: 90.0,
            hr_urgent: 130.0,
            temp_urgent: 39.5,
            shock_index_high: 0.9,
            qsofa_respiratory_rate: 22.0,
            qsofa_systolic_bp: 100.0,
        },
    }
}

fn cardiopulmonary_red_flag() -> TriggerDef {
    TriggerDef {
        id: "cardiopulmonary_red_flag".into(),
        label: "Cardiopulmonary red flag".into(),
        severity: TriggerSeverity::Urgent,
        detail: "Chest pain reported; acute coronary syndrome must be excluded".into(),
        category: "cardiac".into(),
        precondition: Precondition::Symptom {
            token: "chest_pain".into(),
        },
        critical_when: None,
        critical_at_matches: None,
        mandated_actions: vec![
            "Obtain 12-lead ECG within 10 minutes".into(),
            "Establish IV access and draw troponin".into(),
            "Place on continuous cardiac monitoring".into(),
        ],
    }
}

fn stroke_red_flag() -> TriggerDef {
    TriggerDef {
        id: "stroke_red_flag".into(),
        label: "Stroke red flag".into(),
        severity: TriggerSeverity::Urgent,
        detail: "Focal neurological deficit suggestive of stroke".into(),
        category: "neuro".into(),
        precondition: Precondition::AnySymptoms {
            any_of: vec![
                "slurred_speech".into(),
                "facial_droop".into(),
                "unilateral_weakness".into(),
                "aphasia".into(),
            ],
        },
        critical_when: None,
        critical_at_matches: Some(2),
        mandated_actions: vec![
            "Document time of symptom onset (last known well)".into(),
            "Emergent neurological evaluation; activate stroke protocol".into(),
            "Check capillary glucose".into(),
        ],
    }
}

fn hypoxemia() -> TriggerDef {
    TriggerDef {
        id: "hypoxemia".into(),
        label: "Hypoxemia".into(),
        severity: TriggerSeverity::Urgent,
        detail: "Oxygen saturation below 92%".into(),
        category: "respiratory".into(),
        precondition: Precondition::Vital {
            field: VitalField::Spo2,
            op: CmpOp::Lt,
            value: 92.0,
        },
        critical_when: Some(Precondition::Vital {
            field: VitalField::Spo2,
            op: CmpOp::Lt,
            value: 88.0,
        }),
        critical_at_matches: None,
        mandated_actions: vec![
            "Apply supplemental oxygen; titrate to SpO2 >= 94%".into(),
            "Reassess airway and work of breathing".into(),
        ],
    }
}

fn hypotension() -> TriggerDef {
    TriggerDef {
        id: "hypotension".into(),
        label: "Hypotension".into(),
        severity: TriggerSeverity::Critical,
        detail: "Systolic blood pressure below 90 mmHg".into(),
        category: "hemodynamic".into(),
        precondition: Precondition::Vital {
            field: VitalField::SystolicBp,
            op: CmpOp::Lt,
            value: 90.0,
        },
        critical_when: None,
        critical_at_matches: None,
        mandated_actions: vec![
            "Establish large-bore IV access and begin fluid resuscitation".into(),
            "Continuous monitoring; recheck blood pressure in 5 minutes".into(),
        ],
    }
}

fn tachycardia_severe() -> TriggerDef {
    TriggerDef {
        id: "tachycardia_severe".into(),
        label: "Severe tachycardia".into(),
        severity: TriggerSeverity::Urgent,
        detail: "Heart rate at or above 130 bpm".into(),
        category: "hemodynamic".into(),
        precondition: Precondition::Vital {
            field: VitalField::HeartRate,
            op: CmpOp::Ge,
            value: 130.0,
        },
        critical_when: None,
        critical_at_matches: None,
        mandated_actions: vec!["Obtain 12-lead ECG and continuous cardiac monitoring".into()],
    }
}

fn fever_sepsis() -> TriggerDef {
    TriggerDef {
        id: "fever_sepsis".into(),
        label: "High fever".into(),
        severity: TriggerSeverity::Urgent,
        detail: "Temperature at or above 39.5 C; evaluate for sepsis".into(),
        category: "infectious".into(),
        precondition: Precondition::Vital {
            field: VitalField::TemperatureC,
            op: CmpOp::Ge,
            value: 39.5,
        },
        critical_when: None,
        critical_at_matches: None,
        mandated_actions: vec![
            "Draw blood cultures and serum lactate".into(),
            "Begin sepsis bundle per local protocol".into(),
        ],
    }
}

fn hemodynamic_combo() -> TriggerDef {
    TriggerDef {
        id: "hemodynamic_combo".into(),
        label: "Hypoxemia with chest pain".into(),
        severity: TriggerSeverity::Critical,
        detail: "Oxygen saturation below 92% together with chest pain".into(),
        category: "cardiorespiratory".into(),
        precondition: Precondition::AllOf {
            all_of: vec![
                Precondition::Vital {
                    field: VitalField::Spo2,
                    op: CmpOp::Lt,
                    value: 92.0,
                },
                Precondition::Symptom {
                    token: "chest_pain".into(),
                },
            ],
        },
        critical_when: None,
        critical_at_matches: None,
        mandated_actions: vec![
            "Immediate physician evaluation at bedside".into(),
            "Prepare for possible rapid-response activation".into(),
        ],
    }
}

fn pregnancy_bleeding() -> TriggerDef {
    TriggerDef {
        id: "pregnancy_bleeding".into(),
        label: "Bleeding in pregnancy".into(),
        severity: TriggerSeverity::Urgent,
        detail: "Vaginal bleeding with known pregnancy".into(),
        category: "obstetric".into(),
        precondition: Precondition::AllOf {
            all_of: vec![
                Precondition::RiskFactor {
                    token: "pregnancy".into(),
                },
                Precondition::Symptom {
                    token: "vaginal_bleeding".into(),
                },
            ],
        },
        critical_when: None,
        critical_at_matches: None,
        mandated_actions: vec![
            "Urgent obstetric consultation".into(),
            "Quantify blood loss and repeat vital signs".into(),
        ],
    }
}

fn gi_bleed() -> TriggerDef {
    TriggerDef {
        id: "gi_bleed".into(),
        label: "Gastrointestinal bleeding".into(),
        severity: TriggerSeverity::Urgent,
        detail: "Hematemesis or melena reported".into(),
        category: "gi".into(),
        precondition: Precondition::AnySymptoms {
            any_of: vec!["hematemesis".into(), "melena".into()],
        },
        critical_when: None,
        critical_at_matches: None,
        mandated_actions: vec![
            "Type and screen; serial hemoglobin".into(),
            "Establish large-bore IV access".into(),
        ],
    }
}

fn syncope() -> TriggerDef {
    TriggerDef {
        id: "syncope".into(),
        label: "Syncope".into(),
        severity: TriggerSeverity::Urgent,
        detail: "Transient loss of consciousness reported".into(),
        category: "cardiac".into(),
        precondition: Precondition::Symptom {
            token: "syncope".into(),
        },
        critical_when: None,
        critical_at_matches: None,
        mandated_actions: vec!["Obtain 12-lead ECG and orthostatic vital signs".into()],
    }
}

fn red_flag_mappings() -> Vec<RedFlagMapping> {
    let map = |token: &str, phrase: &str| RedFlagMapping {
        token: token.into(),
        phrase: phrase.into(),
    };
    vec![
        map("chest_pain", "Potential acute coronary syndrome"),
        map("dyspnea", "Respiratory compromise risk"),
        map("altered_mental_status", "Possible neurological or metabolic emergency"),
        map("syncope", "Syncope requiring urgent evaluation"),
        map("severe_headache", "Possible intracranial pathology"),
        map("slurred_speech", "Possible stroke"),
        map("facial_droop", "Possible stroke"),
        map("unilateral_weakness", "Possible stroke"),
        map("aphasia", "Possible stroke"),
        map("hematemesis", "Possible upper GI bleed"),
        map("melena", "Possible gastrointestinal bleed"),
        map("vaginal_bleeding", "Possible obstetric emergency"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rulebook_has_canonical_trigger_set() {
        let rb = default_rulebook();
        let ids: Vec<&str> = rb.triggers.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "cardiopulmonary_red_flag",
                "stroke_red_flag",
                "hypoxemia",
                "hypotension",
                "tachycardia_severe",
                "fever_sepsis",
                "hemodynamic_combo",
                "pregnancy_bleeding",
                "gi_bleed",
                "syncope",
            ]
        );
    }

    #[test]
    fn trigger_ids_unique() {
        let rb = default_rulebook();
        let mut ids: Vec<&String> = rb.triggers.iter().map(|t| &t.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), rb.triggers.len());
    }

    #[test]
    fn urgent_and_critical_triggers_mandate_actions() {
        let rb = default_rulebook();
        for trigger in &rb.triggers {
            assert!(
                !trigger.mandated_actions.is_empty(),
                "trigger {} has no mandated actions",
                trigger.id
            );
        }
    }

    #[test]
    fn red_flag_tokens_are_known_symptoms() {
        let rb = default_rulebook();
        for mapping in &rb.red_flags {
            assert!(
                vigil_core::catalog::is_known_symptom(&mapping.token),
                "unknown red-flag token {}",
                mapping.token
            );
        }
    }

    #[test]
    fn canonical_json_is_stable() {
        let a = default_rulebook().canonical_json().unwrap();
        let b = default_rulebook().canonical_json().unwrap();
        assert_eq!(a, b);
        assert!(a.contains("\"version\":\"2026-05.r2\""));
        assert!(!a.ends_with('\n'));
    }

    #[test]
    fn canonical_digest_matches_reserialization() {
        let rb = default_rulebook();
        let digest = rb.canonical_sha256().unwrap();
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, default_rulebook().canonical_sha256().unwrap());
    }
}
