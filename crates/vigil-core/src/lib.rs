//! # vigil-core
//!
//! Shared domain types and deterministic building blocks for the vigil
//! clinical-triage engine:
//!
//! - [`intake`]: untrusted-input types ([`Intake`], [`Vitals`]) and entry-point
//!   validation
//! - [`structured`] / [`outputs`] / [`result`]: the per-stage output records
//!   and the aggregated [`TriageResult`]
//! - [`catalog`]: canonical symptom and risk-factor catalogs with
//!   negation-aware extraction
//! - [`phi`]: PHI detection heuristics (category labels only, never matches)
//! - [`canonical`]: canonical JSON serialization and SHA-256 digests
//! - [`errors`]: the caller-visible error taxonomy
//! - [`logging`]: `tracing` subscriber initialization

#![deny(unsafe_code)]

pub mod canonical;
pub mod catalog;
pub mod errors;
pub mod ids;
pub mod intake;
pub mod logging;
pub mod outputs;
pub mod phi;
pub mod result;
pub mod structured;
pub mod text;

pub use errors::{IntakeInvalidReason, TriageError};
pub use ids::RequestId;
pub use intake::{Demographics, Intake, Vitals};
pub use outputs::{
    ActionSource, CommunicationOutput, EvidenceOutput, NextAction, ProtocolCitation,
    ReasoningBackend, ReasoningOutput, RiskScores, RiskTier, SafetyOutput, SafetyTrigger,
    TriggerSeverity,
};
pub use result::{StageOutput, TraceEntry, TriageResult};
pub use structured::StructuredIntake;
