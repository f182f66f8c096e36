//! Policy pack schema.
//!
//! The wire shape mirrors the published pack format: a versioned, ordered
//! list of policies, each with matchers over structured signals and a list
//! of recommended actions.

use serde::{Deserialize, Serialize};

use vigil_core::intake::Vitals;

/// Vital-sign fields a pack matcher may reference.
pub const KNOWN_VITAL_FIELDS: &[&str] = &[
    "heart_rate",
    "systolic_bp",
    "diastolic_bp",
    "temperature_c",
    "spo2",
    "respiratory_rate",
];

/// Comparison operator in a vital predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VitalOp {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
}

impl VitalOp {
    #[must_use]
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Eq => (lhs - rhs).abs() < f64::EPSILON,
        }
    }
}

/// One vital-sign predicate, e.g. `spo2 < 92`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VitalPredicate {
    pub field: String,
    pub op: VitalOp,
    pub value: f64,
}

impl VitalPredicate {
    /// Evaluate against a vitals record. Absent vitals never satisfy.
    #[must_use]
    pub fn holds(&self, vitals: &Vitals) -> bool {
        let observed = match self.field.as_str() {
            "heart_rate" => vitals.heart_rate,
            "systolic_bp" => vitals.systolic_bp,
            "diastolic_bp" => vitals.diastolic_bp,
            "temperature_c" => vitals.temperature_c,
            "spo2" => vitals.spo2,
            "respiratory_rate" => vitals.respiratory_rate,
            _ => None,
        };
        observed.is_some_and(|v| self.op.holds(v, self.value))
    }
}

/// Matcher groups for one policy. A policy matches when every *present*
/// group succeeds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Matchers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symptoms_all_of: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symptoms_any_of: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_factors_any_of: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vitals: Option<Vec<VitalPredicate>>,
}

/// One protocol snippet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub title: String,
    pub citation: String,
    #[serde(default)]
    pub matchers: Matchers,
    pub recommended_actions: Vec<String>,
}

/// The full, ordered policy pack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyPack {
    pub version: String,
    pub policies: Vec<Policy>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vital_predicate_absent_fails() {
        let pred = VitalPredicate {
            field: "spo2".into(),
            op: VitalOp::Lt,
            value: 92.0,
        };
        assert!(!pred.holds(&Vitals::default()));
    }

    #[test]
    fn vital_predicate_evaluates() {
        let pred = VitalPredicate {
            field: "temperature_c".into(),
            op: VitalOp::Ge,
            value: 39.5,
        };
        let vitals = Vitals {
            temperature_c: Some(39.7),
            ..Vitals::default()
        };
        assert!(pred.holds(&vitals));
    }

    #[test]
    fn op_serializes_as_symbol() {
        let pred = VitalPredicate {
            field: "spo2".into(),
            op: VitalOp::Lt,
            value: 92.0,
        };
        let json = serde_json::to_value(&pred).unwrap();
        assert_eq!(json["op"], "<");
    }

    #[test]
    fn pack_parses_spec_shape() {
        let raw = r#"{
            "version": "1",
            "policies": [{
                "id": "p1",
                "title": "T",
                "citation": "C",
                "matchers": {"symptoms_any_of": ["chest_pain"], "vitals": [{"field": "spo2", "op": "<", "value": 92}]},
                "recommended_actions": ["Act"]
            }]
        }"#;
        let pack: PolicyPack = serde_json::from_str(raw).unwrap();
        assert_eq!(pack.policies.len(), 1);
        assert_eq!(
            pack.policies[0].matchers.vitals.as_ref().unwrap()[0].op,
            VitalOp::Lt
        );
    }
}
