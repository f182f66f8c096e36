//! Pipeline orchestrator.
//!
//! Enforces the fixed stage order, times every stage, maintains the
//! five-entry trace, and computes the final aggregates. The orchestrator
//! performs no I/O of its own; only the reasoning and communication stages
//! touch the network, and both degrade in-band. Safety always runs once
//! structuring has completed, including under cancellation.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{SecondsFormat, Utc};
use tokio_util::sync::CancellationToken;
use tracing::info;

use vigil_core::errors::TriageError;
use vigil_core::ids::RequestId;
use vigil_core::intake::Intake;
use vigil_core::result::{StageOutput, TraceEntry, TriageResult, STAGE_NAMES};
use vigil_llm::config::{BackendConfig, BackendKind, CircuitConfig};
use vigil_llm::{ChatClient, CircuitRegistry};
use vigil_policy::{load_embedded, load_from_path, PolicyPackError, PolicySnapshot};
use vigil_rules::types::Rulebook;
use vigil_rules::default_rulebook;
use vigil_settings::{BackendChoice, BackendSettings, TriageSettings};

use crate::confidence::confidence;
use crate::context::RunContext;
use crate::stages::{
    CommunicationStage, EvidenceStage, ReasoningStage, SafetyStage, StructuringStage,
};

/// Version recorded on every result.
pub const PIPELINE_VERSION: &str = "0.4.0";

/// The five-stage triage pipeline. One instance serves many concurrent
/// requests; all shared state (policy snapshot, rulebook, circuit breaker)
/// is immutable or internally synchronized.
pub struct TriagePipeline {
    settings: TriageSettings,
    rulebook: Arc<Rulebook>,
    policy: Arc<PolicySnapshot>,
    structuring: StructuringStage,
    reasoning: ReasoningStage,
    evidence: EvidenceStage,
    safety: SafetyStage,
    communication: CommunicationStage,
}

impl TriagePipeline {
    /// Build a pipeline from settings. Loads and validates the policy pack
    /// (configured path or embedded default); a malformed pack fails here,
    /// at startup, never at request time.
    pub fn new(settings: TriageSettings) -> Result<Self, PolicyPackError> {
        let snapshot = match &settings.policy.pack_path {
            Some(path) => load_from_path(Path::new(path))?,
            None => load_embedded()?,
        };
        Ok(Self::with_components(
            settings,
            Arc::new(snapshot),
            Arc::new(default_rulebook()),
        ))
    }

    /// Build a pipeline from pre-loaded components.
    #[must_use]
    pub fn with_components(
        settings: TriageSettings,
        policy: Arc<PolicySnapshot>,
        rulebook: Arc<Rulebook>,
    ) -> Self {
        let circuits = Arc::new(CircuitRegistry::new(CircuitConfig {
            failures_threshold: settings.circuit.failures_threshold,
            cooldown: Duration::from_millis(settings.circuit.cooldown_ms),
            window: Duration::from_millis(settings.circuit.window_ms),
        }));
        let client = ChatClient::new(reqwest::Client::new(), circuits);

        let reasoning_config = backend_config(&settings.reasoning, settings.phi_guard.enabled);
        let communication_config =
            backend_config(&settings.communication, settings.phi_guard.enabled);

        info!(
            policy_source = policy.source(),
            policy_sha256 = policy.sha256(),
            rules_version = %rulebook.version,
            "triage pipeline initialized"
        );

        Self {
            structuring: StructuringStage::new(rulebook.negation_window),
            reasoning: ReasoningStage::new(reasoning_config, client.clone()),
            evidence: EvidenceStage::new(Arc::clone(&policy), settings.policy.top_k),
            safety: SafetyStage::new(Arc::clone(&rulebook)),
            communication: CommunicationStage::new(communication_config, client),
            settings,
            rulebook,
            policy,
        }
    }

    /// The loaded policy snapshot (read-only governance surface).
    #[must_use]
    pub fn policy(&self) -> &PolicySnapshot {
        &self.policy
    }

    /// The safety rulebook (read-only governance surface).
    #[must_use]
    pub fn rulebook(&self) -> &Rulebook {
        &self.rulebook
    }

    /// Entry point for raw JSON callers: size check, parse, validate, run.
    pub async fn triage_json(
        &self,
        bytes: &[u8],
        request_id: Option<String>,
        cancel: CancellationToken,
    ) -> Result<TriageResult, TriageError> {
        let intake = Intake::from_json_slice(bytes, self.settings.request.max_bytes)?;
        self.triage(intake, request_id, cancel).await
    }

    /// Run the five stages in order and aggregate the result.
    ///
    /// Cancellation before structuring aborts with [`TriageError::Cancelled`].
    /// Afterwards the pipeline always completes: external calls observe the
    /// token and fall back deterministically, and the cancelled stage is
    /// marked in the trace.
    pub async fn triage(
        &self,
        intake: Intake,
        request_id: Option<String>,
        cancel: CancellationToken,
    ) -> Result<TriageResult, TriageError> {
        intake.validate()?;
        if cancel.is_cancelled() {
            return Err(TriageError::Cancelled);
        }

        let started = Instant::now();
        let deadline = started + Duration::from_millis(self.settings.request.deadline_ms);
        let request_id = request_id.map_or_else(RequestId::new, RequestId::from);
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut ctx = RunContext::new(request_id, intake);
        let mut trace: Vec<TraceEntry> = Vec::with_capacity(STAGE_NAMES.len());

        // 1. Intake structuring (pure CPU).
        let stage_start = Instant::now();
        ctx.structured = self.structuring.run(&ctx.intake);
        trace.push(TraceEntry {
            agent: STAGE_NAMES[0].to_string(),
            latency_ms: elapsed_ms(stage_start),
            output: StageOutput::Structuring(ctx.structured.clone()),
            error: None,
        });

        // 2. Multimodal reasoning (optionally external, never throws).
        let stage_start = Instant::now();
        ctx.reasoning = self
            .reasoning
            .run(&ctx.structured, &ctx.intake, deadline, &cancel)
            .await;
        trace.push(TraceEntry {
            agent: STAGE_NAMES[1].to_string(),
            latency_ms: elapsed_ms(stage_start),
            output: StageOutput::Reasoning(ctx.reasoning.clone()),
            error: cancelled_marker(ctx.reasoning.reasoning_backend_error.as_deref()),
        });

        // 3. Evidence & policy (pure CPU).
        let stage_start = Instant::now();
        ctx.evidence = self.evidence.run(&ctx.structured, &ctx.intake.vitals);
        trace.push(TraceEntry {
            agent: STAGE_NAMES[2].to_string(),
            latency_ms: elapsed_ms(stage_start),
            output: StageOutput::Evidence(ctx.evidence.clone()),
            error: None,
        });

        // 4. Safety & escalation. Must always run; also merges the actions.
        let stage_start = Instant::now();
        let (safety_output, merged_actions) = self.safety.run(
            &ctx.structured,
            &ctx.intake.vitals,
            &ctx.reasoning,
            &ctx.evidence,
        );
        ctx.safety = safety_output;
        trace.push(TraceEntry {
            agent: STAGE_NAMES[3].to_string(),
            latency_ms: elapsed_ms(stage_start),
            output: StageOutput::Safety(ctx.safety.clone()),
            error: None,
        });

        // 5. Communication (draft always; rewrite optional).
        let stage_start = Instant::now();
        let communication = self
            .communication
            .run(
                &ctx.intake,
                &ctx.structured,
                &ctx.safety,
                &ctx.reasoning,
                &merged_actions,
                deadline,
                &cancel,
            )
            .await;
        trace.push(TraceEntry {
            agent: STAGE_NAMES[4].to_string(),
            latency_ms: elapsed_ms(stage_start),
            output: StageOutput::Communication(communication.clone()),
            error: cancelled_marker(communication.communication_backend_error.as_deref()),
        });

        let confidence = confidence(
            &ctx.structured,
            &ctx.intake.vitals,
            &ctx.safety,
            &ctx.reasoning,
        );

        info!(
            request_id = %ctx.request_id,
            tier = %ctx.safety.risk_tier,
            confidence,
            latency_ms = elapsed_ms(started),
            "triage completed"
        );

        Ok(TriageResult {
            request_id: ctx.request_id.to_string(),
            created_at,
            pipeline_version: PIPELINE_VERSION.to_string(),
            total_latency_ms: elapsed_ms(started),
            confidence,
            recommended_next_actions: merged_actions,
            red_flags: ctx.safety.red_flags.clone(),
            risk_tier: ctx.safety.risk_tier,
            // Derived, never taken from upstream stages.
            escalation_required: ctx.safety.risk_tier.requires_escalation(),
            differential_considerations: ctx.reasoning.differential_considerations.clone(),
            clinician_handoff: communication.clinician_handoff,
            patient_summary: communication.patient_summary,
            uncertainty_reasons: ctx.safety.uncertainty_reasons.clone(),
            trace,
        })
    }
}

fn backend_config(settings: &BackendSettings, phi_guard: bool) -> BackendConfig {
    BackendConfig {
        kind: match settings.backend {
            BackendChoice::Deterministic => BackendKind::Deterministic,
            BackendChoice::External => BackendKind::External,
        },
        base_url: settings.base_url.clone(),
        model: settings.model.clone(),
        api_key: settings.api_key.clone(),
        send_images: settings.send_images,
        max_images: settings.max_images,
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
        timeout: Duration::from_millis(settings.timeout_ms),
        max_retries: settings.max_retries,
        retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
        phi_guard,
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Trace entries mark a stage as cancelled only when cancellation (not an
/// ordinary backend failure) caused the degradation.
fn cancelled_marker(backend_error: Option<&str>) -> Option<String> {
    (backend_error == Some("cancelled")).then(|| "cancelled".to_string())
}
