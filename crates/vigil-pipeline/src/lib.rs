//! # vigil-pipeline
//!
//! The five-stage triage pipeline:
//!
//! ```text
//! Intake ─► Structuring ─► Reasoning ─► Evidence/Policy ─► Safety ─► Communication ─► TriageResult
//! ```
//!
//! Stages run strictly in order within a request and share an append-only
//! [`context::RunContext`]. The orchestrator times every stage, records the
//! five-entry trace, enforces the tier/escalation invariants, and merges
//! safety-mandated actions ahead of policy recommendations.
//!
//! Only the reasoning and communication stages perform I/O, through
//! `vigil-llm`; everything else is CPU-bound and deterministic. Safety always
//! runs once structuring has completed, even under cancellation.

#![deny(unsafe_code)]

pub mod confidence;
pub mod context;
pub mod orchestrator;
pub mod stages;

pub use context::RunContext;
pub use orchestrator::{TriagePipeline, PIPELINE_VERSION};
