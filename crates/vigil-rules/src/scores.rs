//! Interpretable risk scores.

use vigil_core::intake::Vitals;
use vigil_core::outputs::RiskScores;
use vigil_core::structured::StructuredIntake;

use crate::types::VitalsThresholds;

/// Shock index: heart rate / systolic BP, rounded to two decimals.
///
/// Absent when either vital is missing or systolic BP is non-positive.
#[must_use]
pub fn shock_index(vitals: &Vitals) -> Option<f64> {
    let hr = vitals.heart_rate?;
    let sbp = vitals.systolic_bp?;
    if sbp <= 0.0 {
        return None;
    }
    Some((hr / sbp * 100.0).round() / 100.0)
}

/// qSOFA (0..3): RR >= threshold, SBP <= threshold, altered mental status.
#[must_use]
pub fn qsofa(structured: &StructuredIntake, vitals: &Vitals, thresholds: &VitalsThresholds) -> u8 {
    let mut score = 0u8;
    if vitals
        .respiratory_rate
        .is_some_and(|rr| rr >= thresholds.qsofa_respiratory_rate)
    {
        score += 1;
    }
    if vitals
        .systolic_bp
        .is_some_and(|sbp| sbp <= thresholds.qsofa_systolic_bp)
    {
        score += 1;
    }
    if structured.has_symptom("altered_mental_status") {
        score += 1;
    }
    score
}

/// Compute the full [`RiskScores`] record.
#[must_use]
pub fn risk_scores(
    structured: &StructuredIntake,
    vitals: &Vitals,
    thresholds: &VitalsThresholds,
) -> RiskScores {
    let si = shock_index(vitals);
    let q = qsofa(structured, vitals, thresholds);
    RiskScores {
        shock_index: si,
        shock_index_high: si.is_some_and(|v| v >= thresholds.shock_index_high),
        qsofa: q,
        qsofa_high_risk: q >= 2,
    }
}
