//! Communication stage.
//!
//! Builds the SBAR clinician handoff and the patient return precautions
//! deterministically, then optionally asks the external rewriter to improve
//! clarity. A rewrite is accepted only when it preserves every red-flag
//! phrase and all four SBAR section headers; otherwise the draft stands and
//! `communication_backend_error="facts_dropped"` is recorded.

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use vigil_core::intake::{Intake, Vitals};
use vigil_core::outputs::{
    CommunicationOutput, NextAction, ReasoningBackend, ReasoningOutput, RiskTier, SafetyOutput,
};
use vigil_core::structured::StructuredIntake;
use vigil_llm::config::{BackendConfig, BackendKind};
use vigil_llm::rewrite::{ExternalRewriter, COMMUNICATION_PROMPT_VERSION};
use vigil_llm::ChatClient;

/// SBAR section headers, all of which must survive a rewrite.
const SBAR_HEADERS: [&str; 4] = ["Situation:", "Background:", "Assessment:", "Recommendation:"];

/// Red flags and actions quoted in the drafts.
const TOP_RED_FLAGS: usize = 5;
const TOP_ACTIONS: usize = 3;

/// Fifth pipeline stage: clinician handoff and patient precautions.
pub struct CommunicationStage {
    external: Option<ExternalRewriter>,
}

impl CommunicationStage {
    #[must_use]
    pub fn new(config: BackendConfig, client: ChatClient) -> Self {
        let external = match config.kind {
            BackendKind::External => Some(ExternalRewriter::new(config, client)),
            BackendKind::Deterministic => None,
        };
        Self { external }
    }

    /// Run the stage. Infallible: rewrite failures keep the drafts.
    pub async fn run(
        &self,
        intake: &Intake,
        structured: &StructuredIntake,
        safety: &SafetyOutput,
        reasoning: &ReasoningOutput,
        actions: &[NextAction],
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> CommunicationOutput {
        let clinician_draft = build_handoff(intake, structured, safety, reasoning, actions);
        let patient_draft = build_patient_summary(safety);

        let mut output = CommunicationOutput {
            clinician_handoff: clinician_draft.clone(),
            patient_summary: patient_draft.clone(),
            communication_backend: ReasoningBackend::Deterministic,
            communication_backend_model: None,
            communication_prompt_version: COMMUNICATION_PROMPT_VERSION.to_string(),
            communication_backend_error: None,
            communication_backend_skipped_reason: None,
        };

        let Some(rewriter) = &self.external else {
            output.communication_backend_skipped_reason =
                Some("backend=deterministic".to_string());
            return output;
        };

        match rewriter
            .rewrite(
                &clinician_draft,
                &patient_draft,
                &structured.phi_hits,
                deadline,
                cancel,
            )
            .await
        {
            Ok(rewrite) => {
                if rewrite_preserves_facts(
                    &rewrite.clinician_handoff,
                    &rewrite.patient_summary,
                    &safety.red_flags,
                ) {
                    output.clinician_handoff = rewrite.clinician_handoff;
                    output.patient_summary = rewrite.patient_summary;
                    output.communication_backend = ReasoningBackend::External;
                    output.communication_backend_model = Some(rewrite.model);
                } else {
                    debug!("rewrite dropped facts, keeping deterministic drafts");
                    output.communication_backend_error = Some("facts_dropped".to_string());
                }
            }
            Err(err) => {
                if let Some(reason) = err.skip_reason() {
                    output.communication_backend_skipped_reason = Some(reason.to_string());
                } else {
                    output.communication_backend_error = Some(err.wire_label());
                }
            }
        }
        output
    }
}

/// A rewrite is acceptable only when every red-flag phrase and every SBAR
/// header is still present (section order is not constrained).
fn rewrite_preserves_facts(clinician: &str, patient: &str, red_flags: &[String]) -> bool {
    if !SBAR_HEADERS.iter().all(|h| clinician.contains(h)) {
        return false;
    }
    let combined = format!("{clinician}\n{patient}");
    red_flags
        .iter()
        .take(TOP_RED_FLAGS)
        .all(|flag| combined.contains(flag.as_str()))
}

fn build_handoff(
    intake: &Intake,
    structured: &StructuredIntake,
    safety: &SafetyOutput,
    reasoning: &ReasoningOutput,
    actions: &[NextAction],
) -> String {
    let mut lines = Vec::new();

    lines.push("Situation:".to_string());
    lines.push(format!("- Chief complaint: {}", intake.chief_complaint.trim()));
    let escalation = if safety.escalation_required {
        " (escalation required)"
    } else {
        ""
    };
    lines.push(format!("- Risk tier: {}{escalation}", safety.risk_tier));

    lines.push("Background:".to_string());
    let history = intake.history.trim();
    lines.push(format!(
        "- History: {}",
        if history.is_empty() { "not provided" } else { history }
    ));
    lines.push(format!(
        "- Risk factors: {}",
        join_or(&structured.risk_factors, "none identified")
    ));
    lines.push(format!(
        "- Vitals: {}",
        format_vitals_line(&intake.vitals)
    ));

    lines.push("Assessment:".to_string());
    lines.push(format!("- {}", safety.risk_tier_rationale));
    lines.push(format!(
        "- Red flags: {}",
        join_or_slice(&safety.red_flags, TOP_RED_FLAGS, "none detected")
    ));
    lines.push(format!(
        "- Differential considerations: {}",
        join_or_slice(&reasoning.differential_considerations, TOP_ACTIONS, "not available")
    ));

    lines.push("Recommendation:".to_string());
    if actions.is_empty() {
        lines.push("- Clinician evaluation per routine workflow".to_string());
    } else {
        for action in actions.iter().take(TOP_ACTIONS) {
            lines.push(format!("- {}", action.action));
        }
    }
    lines.push("- Clinician review and confirmation required before any action".to_string());

    lines.join("\n")
}

fn build_patient_summary(safety: &SafetyOutput) -> String {
    let mut lines = Vec::new();
    lines.push(
        "You were assessed with an AI-assisted triage tool. This summary supports your care \
team and is not a diagnosis."
            .to_string(),
    );

    match safety.risk_tier {
        RiskTier::Critical | RiskTier::Urgent => {
            lines.push("Seek emergency care immediately if you notice any of the following:".to_string());
        }
        RiskTier::Routine => {
            lines.push(
                "Return to clinic if your symptoms worsen, change, or do not improve within \
48 hours, or sooner if you are worried:"
                    .to_string(),
            );
        }
    }

    if safety.red_flags.is_empty() {
        lines.push("- New chest pain, trouble breathing, confusion, fainting, or severe bleeding".to_string());
    } else {
        for flag in safety.red_flags.iter().take(TOP_RED_FLAGS) {
            lines.push(format!("- {flag}"));
        }
    }

    lines.push("If your condition feels like an emergency, call emergency services now.".to_string());
    lines.join("\n")
}

fn join_or(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.join(", ")
    }
}

fn join_or_slice(items: &[String], limit: usize, fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items
            .iter()
            .take(limit)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn format_vitals_line(vitals: &Vitals) -> String {
    if !vitals.any_present() {
        return "not recorded".to_string();
    }
    let mut parts = Vec::new();
    let fmt = |v: f64| {
        if v.fract() == 0.0 {
            format!("{v:.0}")
        } else {
            format!("{v:.1}")
        }
    };
    if let Some(hr) = vitals.heart_rate {
        parts.push(format!("HR {}", fmt(hr)));
    }
    if let Some(sbp) = vitals.systolic_bp {
        parts.push(format!("SBP {}", fmt(sbp)));
    }
    if let Some(t) = vitals.temperature_c {
        parts.push(format!("Temp {} C", fmt(t)));
    }
    if let Some(s) = vitals.spo2 {
        parts.push(format!("SpO2 {}%", fmt(s)));
    }
    if let Some(rr) = vitals.respiratory_rate {
        parts.push(format!("RR {}", fmt(rr)));
    }
    parts.join(", ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use vigil_core::outputs::ActionSource;
    use vigil_llm::circuit::CircuitRegistry;
    use vigil_llm::config::CircuitConfig;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_client() -> ChatClient {
        ChatClient::new(
            reqwest::Client::new(),
            Arc::new(CircuitRegistry::new(CircuitConfig::default())),
        )
    }

    fn deterministic_stage() -> CommunicationStage {
        CommunicationStage::new(BackendConfig::default(), chat_client())
    }

    fn external_stage(base_url: &str) -> CommunicationStage {
        CommunicationStage::new(
            BackendConfig {
                kind: BackendKind::External,
                base_url: base_url.into(),
                model: "rw".into(),
                max_retries: 0,
                ..BackendConfig::default()
            },
            chat_client(),
        )
    }

    fn safety_with(tier: RiskTier, flags: &[&str]) -> SafetyOutput {
        SafetyOutput {
            risk_tier: tier,
            escalation_required: tier.requires_escalation(),
            red_flags: flags.iter().map(|s| (*s).to_string()).collect(),
            risk_tier_rationale: "Risk tier assessment".to_string(),
            ..SafetyOutput::default()
        }
    }

    fn intake() -> Intake {
        Intake {
            chief_complaint: "crushing chest pain".into(),
            vitals: Vitals {
                heart_rate: Some(128.0),
                systolic_bp: Some(82.0),
                ..Vitals::default()
            },
            ..Intake::default()
        }
    }

    fn actions() -> Vec<NextAction> {
        vec![
            NextAction {
                action: "Obtain 12-lead ECG within 10 minutes".into(),
                source: ActionSource::Safety,
            },
            NextAction {
                action: "Establish IV access and draw troponin".into(),
                source: ActionSource::Safety,
            },
        ]
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn draft_contains_all_sbar_sections() {
        let output = deterministic_stage()
            .run(
                &intake(),
                &StructuredIntake::default(),
                &safety_with(RiskTier::Critical, &["Potential acute coronary syndrome"]),
                &ReasoningOutput::default(),
                &actions(),
                deadline(),
                &CancellationToken::new(),
            )
            .await;
        for header in SBAR_HEADERS {
            assert!(output.clinician_handoff.contains(header), "missing {header}");
        }
        assert!(output.clinician_handoff.contains("crushing chest pain"));
        assert!(output.clinician_handoff.contains("ECG"));
        assert!(output.clinician_handoff.contains("(escalation required)"));
    }

    #[tokio::test]
    async fn urgent_patient_summary_uses_emergency_wording() {
        let output = deterministic_stage()
            .run(
                &intake(),
                &StructuredIntake::default(),
                &safety_with(RiskTier::Urgent, &["Respiratory compromise risk"]),
                &ReasoningOutput::default(),
                &[],
                deadline(),
                &CancellationToken::new(),
            )
            .await;
        assert!(output.patient_summary.contains("Seek emergency care immediately"));
        assert!(output.patient_summary.contains("Respiratory compromise risk"));
    }

    #[tokio::test]
    async fn routine_patient_summary_uses_return_precautions() {
        let output = deterministic_stage()
            .run(
                &intake(),
                &StructuredIntake::default(),
                &safety_with(RiskTier::Routine, &[]),
                &ReasoningOutput::default(),
                &[],
                deadline(),
                &CancellationToken::new(),
            )
            .await;
        assert!(output.patient_summary.contains("Return to clinic"));
        assert_eq!(
            output.communication_backend_skipped_reason.as_deref(),
            Some("backend=deterministic")
        );
    }

    #[tokio::test]
    async fn accepted_rewrite_replaces_drafts() {
        let server = MockServer::start().await;
        let rewritten = serde_json::json!({
            "clinician_handoff": "Situation: better\nBackground: b\nAssessment: Potential acute coronary syndrome\nRecommendation: act",
            "patient_summary": "Plain words."
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": rewritten.to_string()}}]
            })))
            .mount(&server)
            .await;

        let output = external_stage(&server.uri())
            .run(
                &intake(),
                &StructuredIntake::default(),
                &safety_with(RiskTier::Critical, &["Potential acute coronary syndrome"]),
                &ReasoningOutput::default(),
                &actions(),
                deadline(),
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(output.communication_backend, ReasoningBackend::External);
        assert_eq!(output.clinician_handoff, "Situation: better\nBackground: b\nAssessment: Potential acute coronary syndrome\nRecommendation: act");
        assert!(output.communication_backend_error.is_none());
    }

    #[tokio::test]
    async fn rewrite_dropping_red_flag_is_rejected() {
        let server = MockServer::start().await;
        let rewritten = serde_json::json!({
            "clinician_handoff": "Situation: s\nBackground: b\nAssessment: all clear\nRecommendation: rest",
            "patient_summary": "You are fine."
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": rewritten.to_string()}}]
            })))
            .mount(&server)
            .await;

        let output = external_stage(&server.uri())
            .run(
                &intake(),
                &StructuredIntake::default(),
                &safety_with(RiskTier::Critical, &["Potential acute coronary syndrome"]),
                &ReasoningOutput::default(),
                &actions(),
                deadline(),
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(output.communication_backend, ReasoningBackend::Deterministic);
        assert_eq!(
            output.communication_backend_error.as_deref(),
            Some("facts_dropped")
        );
        // The deterministic draft is kept.
        assert!(output.clinician_handoff.contains("Potential acute coronary syndrome"));
    }

    #[tokio::test]
    async fn rewrite_dropping_section_header_is_rejected() {
        let server = MockServer::start().await;
        let rewritten = serde_json::json!({
            "clinician_handoff": "Situation: s\nAssessment: Potential acute coronary syndrome\nRecommendation: act",
            "patient_summary": "Summary."
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": rewritten.to_string()}}]
            })))
            .mount(&server)
            .await;

        let output = external_stage(&server.uri())
            .run(
                &intake(),
                &StructuredIntake::default(),
                &safety_with(RiskTier::Critical, &["Potential acute coronary syndrome"]),
                &ReasoningOutput::default(),
                &actions(),
                deadline(),
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(
            output.communication_backend_error.as_deref(),
            Some("facts_dropped")
        );
    }

    #[tokio::test]
    async fn backend_failure_keeps_drafts() {
        let output = external_stage("http://127.0.0.1:1")
            .run(
                &intake(),
                &StructuredIntake::default(),
                &safety_with(RiskTier::Urgent, &["Hypotension (SBP < 90)"]),
                &ReasoningOutput::default(),
                &actions(),
                deadline(),
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(output.communication_backend, ReasoningBackend::Deterministic);
        assert!(output.communication_backend_error.is_some());
        assert!(output.clinician_handoff.contains("Situation:"));
    }

    #[tokio::test]
    async fn phi_guard_skips_rewrite() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let structured = StructuredIntake {
            phi_hits: vec!["history:phone".into()],
            ..StructuredIntake::default()
        };
        let output = external_stage(&server.uri())
            .run(
                &intake(),
                &structured,
                &safety_with(RiskTier::Routine, &[]),
                &ReasoningOutput::default(),
                &[],
                deadline(),
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(
            output.communication_backend_skipped_reason.as_deref(),
            Some("phi_guard")
        );
    }
}
