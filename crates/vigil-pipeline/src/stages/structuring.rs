//! Intake structuring stage.
//!
//! Deterministic, no I/O, no observable errors: anomalies become
//! data-quality warnings, unparsable values become absent fields.

use vigil_core::catalog::{extract_tokens, RISK_FACTORS, SYMPTOMS, VITALS_REQUIRED_SYMPTOMS};
use vigil_core::intake::{Intake, Vitals};
use vigil_core::phi::scan_intake;
use vigil_core::structured::StructuredIntake;
use vigil_core::text::{dedupe, normalize_for_matching};

/// Upper bound on the normalized summary length, in characters.
const SUMMARY_MAX_CHARS: usize = 1200;

/// First pipeline stage: normalize the raw intake into structured signals.
pub struct StructuringStage {
    negation_window: usize,
}

impl StructuringStage {
    /// `negation_window` comes from the rulebook (documented parameter).
    #[must_use]
    pub fn new(negation_window: usize) -> Self {
        Self { negation_window }
    }

    /// Produce the structured intake.
    #[must_use]
    pub fn run(&self, intake: &Intake) -> StructuredIntake {
        let normalized = normalize_for_matching(&intake.combined_text());
        let symptoms = extract_tokens(&normalized, SYMPTOMS, self.negation_window);
        let risk_factors = extract_tokens(&normalized, RISK_FACTORS, self.negation_window);

        let missing_critical_fields = missing_critical_fields(intake, &symptoms);
        let data_quality_warnings = quality_warnings(intake);
        let phi_hits = scan_intake(intake);
        let normalized_summary = build_summary(intake, &symptoms, &risk_factors);

        StructuredIntake {
            normalized_summary,
            symptoms,
            risk_factors,
            missing_critical_fields,
            data_quality_warnings,
            phi_hits,
        }
    }
}

/// Core vitals become mandatory when any cardiopulmonary/sepsis/hemodynamic
/// symptom token is present. Fixed field order: HR, SBP, SpO2, Temp.
fn missing_critical_fields(intake: &Intake, symptoms: &[String]) -> Vec<String> {
    let mut missing = Vec::new();
    if intake.chief_complaint.trim().is_empty() {
        missing.push("chief_complaint".to_string());
    }

    let vitals_required = symptoms
        .iter()
        .any(|s| VITALS_REQUIRED_SYMPTOMS.contains(&s.as_str()));
    if vitals_required {
        let v = &intake.vitals;
        for (value, field) in [
            (v.heart_rate, "vitals.heart_rate"),
            (v.systolic_bp, "vitals.systolic_bp"),
            (v.spo2, "vitals.spo2"),
            (v.temperature_c, "vitals.temperature_c"),
        ] {
            if value.is_none() {
                missing.push(field.to_string());
            }
        }
    }
    missing
}

fn quality_warnings(intake: &Intake) -> Vec<String> {
    let mut warnings = Vec::new();

    match intake.demographics.age {
        None => warnings.push("Age missing".to_string()),
        Some(age) if age < 0 => warnings.push("Age < 0 (input error)".to_string()),
        Some(age) if age > 120 => warnings.push("Age > 120 (check input)".to_string()),
        Some(_) => {}
    }

    let v = &intake.vitals;
    if v.heart_rate.is_some_and(|hr| !(20.0..=250.0).contains(&hr)) {
        warnings.push("Heart rate out of plausible range (20-250)".to_string());
    }
    if v.systolic_bp.is_some_and(|bp| !(40.0..=260.0).contains(&bp)) {
        warnings.push("Systolic BP out of plausible range (40-260)".to_string());
    }
    if v.temperature_c.is_some_and(|t| !(30.0..=44.0).contains(&t)) {
        warnings.push("Temperature out of plausible range (30-44 C)".to_string());
    }
    if v.spo2.is_some_and(|s| !(0.0..=100.0).contains(&s)) {
        warnings.push("SpO2 out of plausible range (0-100)".to_string());
    }
    if v
        .respiratory_rate
        .is_some_and(|rr| !(4.0..=70.0).contains(&rr))
    {
        warnings.push("Respiratory rate out of plausible range (4-70)".to_string());
    }
    if let (Some(sbp), Some(dbp)) = (v.systolic_bp, v.diastolic_bp) {
        if sbp > 0.0 && dbp > 0.0 && dbp >= sbp {
            warnings.push("Diastolic BP >= systolic BP (input error)".to_string());
        }
    }

    dedupe(warnings)
}

/// Deterministic one-line summary. Empty sections are omitted; token order
/// is catalog order, so the summary is stable for identical intakes.
fn build_summary(intake: &Intake, symptoms: &[String], risk_factors: &[String]) -> String {
    let mut parts = vec![format!("CC: {}", intake.chief_complaint.trim())];

    let history = intake.history.trim();
    if !history.is_empty() {
        parts.push(format!("Hx: {history}"));
    }

    if let Some(vitals) = format_vitals(&intake.vitals) {
        parts.push(format!("Vitals: {vitals}"));
    }
    if !symptoms.is_empty() {
        parts.push(format!("Symptoms: {}", symptoms.join(", ")));
    }
    if !risk_factors.is_empty() {
        parts.push(format!("RiskFactors: {}", risk_factors.join(", ")));
    }

    let summary = parts.join(" | ");
    if summary.chars().count() > SUMMARY_MAX_CHARS {
        summary.chars().take(SUMMARY_MAX_CHARS).collect()
    } else {
        summary
    }
}

fn format_vitals(v: &Vitals) -> Option<String> {
    if !v.any_present() {
        return None;
    }
    let mut parts = Vec::new();
    if let Some(hr) = v.heart_rate {
        parts.push(format!("HR={}", fmt_num(hr)));
    }
    if let Some(sbp) = v.systolic_bp {
        let dbp = v
            .diastolic_bp
            .map_or_else(|| "?".to_string(), fmt_num);
        parts.push(format!("BP={}/{dbp}", fmt_num(sbp)));
    }
    if let Some(t) = v.temperature_c {
        parts.push(format!("Temp={}C", fmt_num(t)));
    }
    if let Some(s) = v.spo2 {
        parts.push(format!("SpO2={}%", fmt_num(s)));
    }
    if let Some(rr) = v.respiratory_rate {
        parts.push(format!("RR={}", fmt_num(rr)));
    }
    Some(parts.join(", "))
}

fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
