//! Rulebook data types.
//!
//! Preconditions are data, not code, so the whole rulebook serializes to the
//! versioned JSON that the governance surface exposes read-only.

use serde::{Deserialize, Serialize};

use vigil_core::intake::Vitals;
use vigil_core::outputs::TriggerSeverity;
use vigil_core::structured::StructuredIntake;

/// Vital-sign field referenced by a predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalField {
    HeartRate,
    SystolicBp,
    DiastolicBp,
    TemperatureC,
    Spo2,
    RespiratoryRate,
}

impl VitalField {
    /// Read this field from a vitals record.
    #[must_use]
    pub fn read(self, vitals: &Vitals) -> Option<f64> {
        match self {
            Self::HeartRate => vitals.heart_rate,
            Self::SystolicBp => vitals.systolic_bp,
            Self::DiastolicBp => vitals.diastolic_bp,
            Self::TemperatureC => vitals.temperature_c,
            Self::Spo2 => vitals.spo2,
            Self::RespiratoryRate => vitals.respiratory_rate,
        }
    }
}

/// Comparison operator for vital predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
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

impl CmpOp {
    /// Evaluate `lhs OP rhs`.
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

/// Predicate over the structured intake and raw vitals.
///
/// An absent vital never satisfies a vital predicate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Precondition {
    /// A single symptom token is present.
    Symptom { token: String },
    /// At least one of these symptom tokens is present.
    AnySymptoms { any_of: Vec<String> },
    /// A risk-factor token is present.
    RiskFactor { token: String },
    /// A vital satisfies a comparison.
    Vital {
        field: VitalField,
        op: CmpOp,
        value: f64,
    },
    /// Every sub-predicate holds.
    AllOf { all_of: Vec<Precondition> },
}

impl Precondition {
    /// Whether the predicate holds.
    #[must_use]
    pub fn matches(&self, structured: &StructuredIntake, vitals: &Vitals) -> bool {
        match self {
            Self::Symptom { token } => structured.has_symptom(token),
            Self::AnySymptoms { any_of } => any_of.iter().any(|t| structured.has_symptom(t)),
            Self::RiskFactor { token } => structured.has_risk_factor(token),
            Self::Vital { field, op, value } => field
                .read(vitals)
                .is_some_and(|observed| op.holds(observed, *value)),
            Self::AllOf { all_of } => all_of.iter().all(|p| p.matches(structured, vitals)),
        }
    }

    /// For [`Precondition::AnySymptoms`]: how many listed tokens are present.
    /// Other variants report 1 when matching, 0 otherwise.
    #[must_use]
    pub fn match_count(&self, structured: &StructuredIntake, vitals: &Vitals) -> usize {
        match self {
            Self::AnySymptoms { any_of } => {
                any_of.iter().filter(|t| structured.has_symptom(t)).count()
            }
            other => usize::from(other.matches(structured, vitals)),
        }
    }
}

/// One safety trigger definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggerDef {
    /// Stable identifier.
    pub id: String,
    /// Human label used in rationales.
    pub label: String,
    /// Base severity when the precondition fires.
    pub severity: TriggerSeverity,
    /// Human detail recorded on the fired trigger.
    pub detail: String,
    /// Clinical category; two or more distinct fired categories escalate
    /// the tier one step.
    pub category: String,
    pub precondition: Precondition,
    /// When present and satisfied, the fired severity becomes critical.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical_when: Option<Precondition>,
    /// For any-of preconditions: match count at which the fired severity
    /// becomes critical.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical_at_matches: Option<usize>,
    /// Actions injected ahead of policy recommendations when this trigger
    /// fires at urgent or critical severity.
    pub mandated_actions: Vec<String>,
}

/// Keyword-to-red-flag mapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RedFlagMapping {
    /// Canonical symptom token.
    pub token: String,
    /// Human-readable red-flag phrase.
    pub phrase: String,
}

/// Vitals thresholds referenced by the engine outside trigger preconditions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VitalsThresholds {
    pub spo2_urgent: f64,
    pub sbp_critical: f64,
    pub hr_urgent: f64,
    pub temp_urgent: f64,
    pub shock_index_high: f64,
    pub qsofa_respiratory_rate: f64,
    pub qsofa_systolic_bp: f64,
}

/// The versioned safety rulebook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rulebook {
    /// Rules version recorded on every safety output.
    pub version: String,
    /// Word-window size for negation suppression during intake structuring.
    pub negation_window: usize,
    /// Trigger definitions, in evaluation (and action-injection) order.
    pub triggers: Vec<TriggerDef>,
    /// Symptom-token red-flag phrases.
    pub red_flags: Vec<RedFlagMapping>,
    pub thresholds: VitalsThresholds,
}

impl Rulebook {
    /// Canonical JSON serialization of the rulebook (sorted keys, compact
    /// separators), for read-only governance exposure.
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        let value = serde_json::to_value(self)?;
        Ok(vigil_core::canonical::canonical_json(&value))
    }

    /// SHA-256 (hex) of [`Rulebook::canonical_json`].
    pub fn canonical_sha256(&self) -> Result<String, serde_json::Error> {
        let value = serde_json::to_value(self)?;
        Ok(vigil_core::canonical::canonical_sha256(&value))
    }

    /// Red-flag phrase for a symptom token, if mapped.
    #[must_use]
    pub fn red_flag_phrase(&self, token: &str) -> Option<&str> {
        self.red_flags
            .iter()
            .find(|m| m.token == token)
            .map(|m| m.phrase.as_str())
    }
}
