//! Rulebook evaluation.
//!
//! Evaluates every trigger in rulebook order, applies the composite
//! escalation rules, derives the risk tier, and collects red flags and
//! mandated actions. Pure and deterministic; upstream reasoning output has
//! no input here.

use tracing::debug;

use vigil_core::intake::Vitals;
use vigil_core::outputs::{RiskScores, RiskTier, SafetyTrigger, TriggerSeverity};
use vigil_core::structured::StructuredIntake;
use vigil_core::text::dedupe;

use crate::scores::risk_scores;
use crate::types::Rulebook;

/// Result of one rulebook evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleOutcome {
    /// Fired triggers, in rulebook order, synthetic triggers last.
    pub triggers: Vec<SafetyTrigger>,
    /// Deduplicated human red-flag phrases.
    pub red_flags: Vec<String>,
    pub risk_tier: RiskTier,
    pub escalation_required: bool,
    pub risk_scores: RiskScores,
    /// Mandated actions from fired urgent/critical triggers, in trigger
    /// order, deduplicated.
    pub mandated_actions: Vec<String>,
    /// One sentence naming the dominant trigger(s).
    pub rationale: String,
}

/// Evaluate the rulebook against a structured intake and raw vitals.
#[must_use]
pub fn evaluate(rulebook: &Rulebook, structured: &StructuredIntake, vitals: &Vitals) -> RuleOutcome {
    let mut fired: Vec<FiredTrigger> = Vec::new();

    for def in &rulebook.triggers {
        if !def.precondition.matches(structured, vitals) {
            continue;
        }
        let mut severity = def.severity;
        if let Some(min) = def.critical_at_matches {
            if def.precondition.match_count(structured, vitals) >= min {
                severity = TriggerSeverity::Critical;
            }
        }
        if let Some(pred) = &def.critical_when {
            if pred.matches(structured, vitals) {
                severity = TriggerSeverity::Critical;
            }
        }
        fired.push(FiredTrigger {
            trigger: SafetyTrigger {
                id: def.id.clone(),
                label: def.label.clone(),
                severity,
                detail: def.detail.clone(),
            },
            category: def.category.clone(),
            mandated_actions: def.mandated_actions.clone(),
        });
    }

    // High fever together with severe tachycardia is treated as presumed
    // sepsis until excluded.
    if fired.iter().any(|f| f.trigger.id == "tachycardia_severe") {
        if let Some(fever) = fired.iter_mut().find(|f| f.trigger.id == "fever_sepsis") {
            fever.trigger.severity = TriggerSeverity::Critical;
            fever.trigger.detail =
                "Temperature at or above 39.5 C with severe tachycardia; presumed sepsis".into();
        }
    }

    let scores = risk_scores(structured, vitals, &rulebook.thresholds);
    let any_urgent_fired = fired
        .iter()
        .any(|f| f.trigger.severity == TriggerSeverity::Urgent);

    let mut synthetic: Vec<SafetyTrigger> = Vec::new();
    if scores.shock_index_high {
        // Alone this is informational; alongside an urgent finding it marks
        // hemodynamic instability and escalates the case.
        let severity = if any_urgent_fired {
            TriggerSeverity::Critical
        } else {
            TriggerSeverity::Info
        };
        synthetic.push(SafetyTrigger {
            id: "shock_index_high".into(),
            label: "Elevated shock index".into(),
            severity,
            detail: "Shock index at or above 0.9".into(),
        });
    }
    if scores.qsofa_high_risk {
        synthetic.push(SafetyTrigger {
            id: "qsofa_high".into(),
            label: "qSOFA high risk".into(),
            severity: TriggerSeverity::Info,
            detail: "qSOFA score of 2 or more".into(),
        });
    }

    // Two or more distinct red-flag categories escalate one step.
    let mut categories: Vec<&str> = fired
        .iter()
        .filter(|f| f.trigger.severity != TriggerSeverity::Info)
        .map(|f| f.category.as_str())
        .collect();
    categories.sort_unstable();
    categories.dedup();
    if categories.len() >= 2 {
        let any_critical = fired
            .iter()
            .any(|f| f.trigger.severity == TriggerSeverity::Critical)
            || synthetic
                .iter()
                .any(|t| t.severity == TriggerSeverity::Critical);
        let severity = if any_critical {
            TriggerSeverity::Info
        } else {
            TriggerSeverity::Critical
        };
        synthetic.push(SafetyTrigger {
            id: "multi_category".into(),
            label: "Multiple red-flag categories".into(),
            severity,
            detail: format!("Red flags span {} categories: {}", categories.len(), categories.join(", ")),
        });
    }

    let mut triggers: Vec<SafetyTrigger> = fired.iter().map(|f| f.trigger.clone()).collect();
    triggers.extend(synthetic);

    let risk_tier = decide_tier(&triggers);
    let rationale = build_rationale(risk_tier, &triggers);
    let red_flags = collect_red_flags(rulebook, structured, vitals);

    let mandated_actions = dedupe(
        fired
            .iter()
            .filter(|f| f.trigger.severity != TriggerSeverity::Info)
            .flat_map(|f| f.mandated_actions.iter().cloned()),
    );

    debug!(
        tier = %risk_tier,
        trigger_count = triggers.len(),
        "rulebook evaluated"
    );

    RuleOutcome {
        triggers,
        red_flags,
        risk_tier,
        escalation_required: risk_tier.requires_escalation(),
        risk_scores: scores,
        mandated_actions,
        rationale,
    }
}

struct FiredTrigger {
    trigger: SafetyTrigger,
    category: String,
    mandated_actions: Vec<String>,
}

fn decide_tier(triggers: &[SafetyTrigger]) -> RiskTier {
    if triggers
        .iter()
        .any(|t| t.severity == TriggerSeverity::Critical)
    {
        RiskTier::Critical
    } else if triggers
        .iter()
        .any(|t| t.severity == TriggerSeverity::Urgent)
    {
        RiskTier::Urgent
    } else {
        RiskTier::Routine
    }
}

fn build_rationale(tier: RiskTier, triggers: &[SafetyTrigger]) -> String {
    if tier == RiskTier::Routine {
        return "No urgent or critical safety triggers fired; routine disposition pending clinician review.".to_string();
    }
    let dominant_severity = if tier == RiskTier::Critical {
        TriggerSeverity::Critical
    } else {
        TriggerSeverity::Urgent
    };
    let labels: Vec<&str> = triggers
        .iter()
        .filter(|t| t.severity == dominant_severity)
        .map(|t| t.label.as_str())
        .collect();
    format!("Risk tier {tier} driven by: {}.", labels.join(", "))
}

fn collect_red_flags(
    rulebook: &Rulebook,
    structured: &StructuredIntake,
    vitals: &Vitals,
) -> Vec<String> {
    let mut flags: Vec<String> = Vec::new();
    for token in &structured.symptoms {
        if let Some(phrase) = rulebook.red_flag_phrase(token) {
            flags.push(phrase.to_string());
        }
    }
    let t = &rulebook.thresholds;
    if vitals.spo2.is_some_and(|v| v < t.spo2_urgent) {
        flags.push("Low oxygen saturation (<92%)".into());
    }
    if vitals.systolic_bp.is_some_and(|v| v < t.sbp_critical) {
        flags.push("Hypotension (SBP < 90)".into());
    }
    if vitals.heart_rate.is_some_and(|v| v >= t.hr_urgent) {
        flags.push("Severe tachycardia (HR >= 130)".into());
    }
    if vitals.temperature_c.is_some_and(|v| v >= t.temp_urgent) {
        flags.push("High fever (>= 39.5 C)".into());
    }
    dedupe(flags)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
