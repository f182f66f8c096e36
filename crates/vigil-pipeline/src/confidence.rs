//! Deterministic confidence heuristic.
//!
//! Coverage-driven additive score with tier-dependent caps:
//!
//! ```text
//! score = 0.5
//!       + 0.10  if HR, SBP, SpO2, and Temp are all recorded
//!       + 0.05  per fired urgent/critical trigger (at most 3 counted)
//!       - 0.05  per missing critical field (at most 4 counted)
//!       - 0.05  if external reasoning errored
//! clamped to [0.20, cap]   cap: routine 0.85, urgent 0.90, critical 0.95
//! rounded to two decimals
//! ```
//!
//! Missing inputs lower confidence; corroborating triggers raise it toward
//! the cap. The arithmetic is pinned by the tests below; change it only
//! with a pipeline version bump.

use vigil_core::intake::Vitals;
use vigil_core::outputs::{ReasoningOutput, RiskTier, SafetyOutput, TriggerSeverity};
use vigil_core::structured::StructuredIntake;

/// Compute the confidence scalar for one request.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn confidence(
    structured: &StructuredIntake,
    vitals: &Vitals,
    safety: &SafetyOutput,
    reasoning: &ReasoningOutput,
) -> f64 {
    let mut score = 0.5;

    let core_vitals_present = vitals.heart_rate.is_some()
        && vitals.systolic_bp.is_some()
        && vitals.spo2.is_some()
        && vitals.temperature_c.is_some();
    if core_vitals_present {
        score += 0.10;
    }

    let fired = safety
        .safety_triggers
        .iter()
        .filter(|t| t.severity != TriggerSeverity::Info)
        .count()
        .min(3);
    score += 0.05 * fired as f64;

    score -= 0.05 * structured.missing_critical_fields.len().min(4) as f64;

    if reasoning.reasoning_backend_error.is_some() {
        score -= 0.05;
    }

    let cap = match safety.risk_tier {
        RiskTier::Routine => 0.85,
        RiskTier::Urgent => 0.90,
        RiskTier::Critical => 0.95,
    };
    (score.clamp(0.20, cap) * 100.0).round() / 100.0
}
