//! # vigil-llm
//!
//! External reasoning and rewrite adapter for the triage pipeline.
//!
//! The adapter speaks the OpenAI-compatible chat-completions shape against a
//! single configured endpoint. Around the raw call it layers:
//!
//! - per-attempt timeouts clamped to the request deadline
//! - retry on network errors and HTTP 5xx/429 only
//! - a process-wide circuit breaker per endpoint
//! - prompt hardening for untrusted patient-derived text
//! - a PHI guard that refuses to transmit flagged intakes
//! - JSON-shape recovery for models that wrap JSON in prose
//!
//! Failures never escape to the orchestrator: callers map [`BackendError`]
//! into the typed `*_backend_error` / `*_backend_skipped_reason` fields and
//! fall back to deterministic output.

#![deny(unsafe_code)]

pub mod circuit;
pub mod client;
pub mod config;
pub mod errors;
pub mod harden;
pub mod json_extract;
pub mod reasoning;
pub mod rewrite;

pub use circuit::{CircuitDecision, CircuitRegistry};
pub use client::{ChatClient, ChatMessage};
pub use config::{BackendConfig, BackendKind, CircuitConfig};
pub use errors::BackendError;
pub use reasoning::{ExternalReasoner, ExternalReasoning, Reasoner, REASONING_PROMPT_VERSION};
pub use rewrite::{ExternalRewrite, ExternalRewriter, COMMUNICATION_PROMPT_VERSION};
