//! Policy pack loading, validation, and hashing.
//!
//! Loading happens once at startup (and on explicit reload); a malformed
//! pack is a fatal startup error, never a request-time one. The loaded
//! snapshot is immutable and safe to share across requests without
//! synchronization.

use std::path::Path;

use tracing::info;

use vigil_core::canonical::{canonical_json, canonical_sha256};
use vigil_core::catalog::{is_known_risk_factor, is_known_symptom};

use crate::types::{PolicyPack, KNOWN_VITAL_FIELDS};

/// Default pack compiled into the binary, used when no path is configured.
pub const EMBEDDED_PACK: &str = include_str!("../resources/policy_pack.json");

/// Source label recorded for the embedded pack.
pub const EMBEDDED_SOURCE: &str = "embedded";

/// Errors raised while loading a policy pack. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum PolicyPackError {
    /// Reading the pack file failed.
    #[error("failed to read policy pack: {0}")]
    Io(#[from] std::io::Error),

    /// The pack is not valid JSON for the expected schema.
    #[error("failed to parse policy pack: {0}")]
    Parse(#[from] serde_json::Error),

    /// The pack parsed but violates a structural rule.
    #[error("invalid policy pack: {message}")]
    Validation {
        /// What rule was violated, naming the offending policy.
        message: String,
    },
}

/// Immutable loaded pack plus its canonical digest.
#[derive(Clone, Debug)]
pub struct PolicySnapshot {
    pack: PolicyPack,
    sha256: String,
    source: String,
}

impl PolicySnapshot {
    /// The loaded pack.
    #[must_use]
    pub fn pack(&self) -> &PolicyPack {
        &self.pack
    }

    /// SHA-256 (hex) of the canonical pack serialization.
    #[must_use]
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// Where the pack came from (path or `embedded`).
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Canonical JSON of the loaded pack (sorted keys, compact separators).
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        let value = serde_json::to_value(&self.pack)?;
        Ok(canonical_json(&value))
    }
}

/// Load and validate the embedded default pack.
pub fn load_embedded() -> Result<PolicySnapshot, PolicyPackError> {
    load_from_str(EMBEDDED_PACK, EMBEDDED_SOURCE)
}

/// Load and validate a pack from a file path.
pub fn load_from_path(path: &Path) -> Result<PolicySnapshot, PolicyPackError> {
    let raw = std::fs::read_to_string(path)?;
    load_from_str(&raw, &path.display().to_string())
}

fn load_from_str(raw: &str, source: &str) -> Result<PolicySnapshot, PolicyPackError> {
    let pack: PolicyPack = serde_json::from_str(raw)?;
    validate(&pack)?;
    let value = serde_json::to_value(&pack)?;
    let sha256 = canonical_sha256(&value);
    info!(
        source,
        version = %pack.version,
        policy_count = pack.policies.len(),
        sha256 = %sha256,
        "policy pack loaded"
    );
    Ok(PolicySnapshot {
        pack,
        sha256,
        source: source.to_string(),
    })
}

fn validate(pack: &PolicyPack) -> Result<(), PolicyPackError> {
    let mut seen_ids = std::collections::HashSet::new();
    for policy in &pack.policies {
        if policy.id.trim().is_empty() {
            return Err(validation("policy with empty id"));
        }
        if !seen_ids.insert(policy.id.as_str()) {
            return Err(validation(&format!("duplicate policy id: {}", policy.id)));
        }
        if policy.recommended_actions.is_empty()
            || policy
                .recommended_actions
                .iter()
                .any(|a| a.trim().is_empty())
        {
            return Err(validation(&format!(
                "policy {} has empty recommended actions",
                policy.id
            )));
        }

        let m = &policy.matchers;
        for token in m
            .symptoms_all_of
            .iter()
            .flatten()
            .chain(m.symptoms_any_of.iter().flatten())
        {
            if !is_known_symptom(token) {
                return Err(validation(&format!(
                    "policy {} references unknown symptom token: {token}",
                    policy.id
                )));
            }
        }
        for token in m.risk_factors_any_of.iter().flatten() {
            if !is_known_risk_factor(token) {
                return Err(validation(&format!(
                    "policy {} references unknown risk-factor token: {token}",
                    policy.id
                )));
            }
        }
        for pred in m.vitals.iter().flatten() {
            if !KNOWN_VITAL_FIELDS.contains(&pred.field.as_str()) {
                return Err(validation(&format!(
                    "policy {} references unknown vital field: {}",
                    policy.id, pred.field
                )));
            }
        }
    }
    Ok(())
}

fn validation(message: &str) -> PolicyPackError {
    PolicyPackError::Validation {
        message: message.to_string(),
    }
}
