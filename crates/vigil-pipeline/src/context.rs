//! Per-request run context.

use vigil_core::ids::RequestId;
use vigil_core::intake::Intake;
use vigil_core::outputs::{EvidenceOutput, ReasoningOutput, SafetyOutput};
use vigil_core::structured::StructuredIntake;

/// Append-only state shared by the stages of one triage request.
///
/// The orchestrator creates one context per request, merges each stage's
/// output into it, and discards it when the response is emitted. Stages read
/// earlier outputs but never mutate them.
#[derive(Clone, Debug)]
pub struct RunContext {
    pub request_id: RequestId,
    pub intake: Intake,
    pub structured: StructuredIntake,
    pub reasoning: ReasoningOutput,
    pub evidence: EvidenceOutput,
    pub safety: SafetyOutput,
}

impl RunContext {
    /// Fresh context for a validated intake.
    #[must_use]
    pub fn new(request_id: RequestId, intake: Intake) -> Self {
        Self {
            request_id,
            intake,
            structured: StructuredIntake::default(),
            reasoning: ReasoningOutput::default(),
            evidence: EvidenceOutput::default(),
            safety: SafetyOutput::default(),
        }
    }
}
