//! Multimodal clinical reasoning stage.
//!
//! Delegates to the external adapter when configured, with the rule-table
//! fallback always available. This stage never surfaces an error to the
//! orchestrator: any backend failure is captured in the typed output fields
//! and the deterministic differential is used instead.

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use vigil_core::intake::{Intake, Vitals};
use vigil_core::outputs::{ReasoningBackend, ReasoningOutput};
use vigil_core::structured::StructuredIntake;
use vigil_core::text::dedupe;
use vigil_llm::config::{BackendConfig, BackendKind};
use vigil_llm::reasoning::{ExternalReasoner, Reasoner, REASONING_PROMPT_VERSION};
use vigil_llm::ChatClient;

/// Maximum differential entries produced by either backend.
const MAX_DIFFERENTIAL: usize = 6;

/// Second pipeline stage: differential and rationale.
pub struct ReasoningStage {
    external: Option<ExternalReasoner>,
}

impl ReasoningStage {
    #[must_use]
    pub fn new(config: BackendConfig, client: ChatClient) -> Self {
        let external = match config.kind {
            BackendKind::External => Some(ExternalReasoner::new(config, client)),
            BackendKind::Deterministic => None,
        };
        Self { external }
    }

    /// Run the stage. Infallible: external failures degrade in-band.
    pub async fn run(
        &self,
        structured: &StructuredIntake,
        intake: &Intake,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> ReasoningOutput {
        let images_present = u32::try_from(intake.image_data_urls.len()).unwrap_or(u32::MAX);

        let Some(reasoner) = &self.external else {
            let mut output = deterministic_output(structured, &intake.vitals, images_present);
            output.reasoning_backend_skipped_reason = Some("backend=deterministic".to_string());
            return output;
        };

        match reasoner
            .reason(structured, &intake.image_data_urls, deadline, cancel)
            .await
        {
            Ok(result) => ReasoningOutput {
                differential_considerations: result.differential,
                reasoning_rationale: result.rationale,
                reasoning_backend: ReasoningBackend::External,
                reasoning_backend_model: Some(result.model),
                reasoning_prompt_version: REASONING_PROMPT_VERSION.to_string(),
                images_present,
                images_sent: result.images_sent,
                reasoning_backend_error: None,
                reasoning_backend_skipped_reason: None,
            },
            Err(err) => {
                debug!(error = %err, "external reasoning unavailable, using deterministic fallback");
                let mut output = deterministic_output(structured, &intake.vitals, images_present);
                if let Some(reason) = err.skip_reason() {
                    output.reasoning_backend_skipped_reason = Some(reason.to_string());
                } else {
                    output.reasoning_backend_error = Some(err.wire_label());
                }
                output
            }
        }
    }
}

fn deterministic_output(
    structured: &StructuredIntake,
    vitals: &Vitals,
    images_present: u32,
) -> ReasoningOutput {
    let differential = deterministic_differential(structured, vitals);
    let rationale = deterministic_rationale(structured);
    ReasoningOutput {
        differential_considerations: differential,
        reasoning_rationale: rationale,
        reasoning_backend: ReasoningBackend::Deterministic,
        reasoning_backend_model: None,
        reasoning_prompt_version: REASONING_PROMPT_VERSION.to_string(),
        images_present,
        images_sent: 0,
        reasoning_backend_error: None,
        reasoning_backend_skipped_reason: None,
    }
}

/// Rule table mapping (symptoms, risk factors, vitals outliers) to ranked
/// differentials. Rule order is fixed; output is deduplicated and capped.
fn deterministic_differential(structured: &StructuredIntake, vitals: &Vitals) -> Vec<String> {
    let has = |token: &str| structured.has_symptom(token);
    let hypotensive = vitals.systolic_bp.is_some_and(|sbp| sbp < 90.0);
    let shock_index_high = match (vitals.heart_rate, vitals.systolic_bp) {
        (Some(hr), Some(sbp)) if sbp > 0.0 => hr / sbp >= 0.9,
        _ => false,
    };
    let hypoxic = vitals.spo2.is_some_and(|s| s < 92.0);

    let mut ranked: Vec<&str> = Vec::new();
    if has("chest_pain") && (hypotensive || shock_index_high) {
        ranked.extend_from_slice(&["Acute coronary syndrome", "Aortic dissection", "Pulmonary embolism"]);
    } else if has("chest_pain") {
        ranked.extend_from_slice(&[
            "Acute coronary syndrome",
            "Pulmonary embolism",
            "Gastroesophageal reflux",
            "Musculoskeletal chest pain",
        ]);
    }
    if has("dyspnea") && hypoxic {
        ranked.extend_from_slice(&[
            "Acute hypoxemic respiratory failure",
            "Pulmonary embolism",
            "Pneumonia",
            "Heart failure exacerbation",
        ]);
    } else if has("dyspnea") {
        ranked.extend_from_slice(&[
            "Pneumonia",
            "Asthma or COPD exacerbation",
            "Heart failure exacerbation",
        ]);
    }
    if has("slurred_speech") || has("facial_droop") || has("unilateral_weakness") || has("aphasia")
    {
        ranked.extend_from_slice(&["Acute ischemic stroke", "Transient ischemic attack", "Hypoglycemia"]);
    }
    if has("fever") && has("altered_mental_status") {
        ranked.extend_from_slice(&["Sepsis", "Meningitis or encephalitis"]);
    } else if has("fever") && has("cough") {
        ranked.extend_from_slice(&["Community-acquired pneumonia", "Viral respiratory infection"]);
    }
    if has("hematemesis") || has("melena") {
        ranked.extend_from_slice(&["Upper gastrointestinal bleeding", "Peptic ulcer disease"]);
    }
    if has("syncope") {
        ranked.extend_from_slice(&["Cardiac arrhythmia", "Vasovagal syncope", "Orthostatic hypotension"]);
    }
    if has("sore_throat") {
        ranked.extend_from_slice(&["Viral pharyngitis", "Streptococcal pharyngitis"]);
    }
    if ranked.is_empty() {
        ranked.extend_from_slice(&["Viral syndrome", "Medication side effect", "Dehydration"]);
    }

    let mut out = dedupe(ranked.into_iter().map(str::to_string));
    out.truncate(MAX_DIFFERENTIAL);
    out
}

fn deterministic_rationale(structured: &StructuredIntake) -> String {
    let symptoms = if structured.symptoms.is_empty() {
        "no cataloged symptoms".to_string()
    } else {
        structured.symptoms.join(", ")
    };
    let risks = if structured.risk_factors.is_empty() {
        "none identified".to_string()
    } else {
        structured.risk_factors.join(", ")
    };
    format!(
        "Differentials are prioritized from the reported symptom pattern ({symptoms}), \
recorded risk factors ({risks}), and available vital signs. No diagnosis is made; \
clinician validation is required."
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
