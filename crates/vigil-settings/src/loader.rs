//! Settings loading.
//!
//! Three layers, later layers winning: compiled defaults, then the JSON
//! settings file folded over them key by key, then `VIGIL_*` environment
//! overrides. Nested objects fold per-entry; arrays and scalars are taken
//! wholesale from the file; explicit nulls in the file are ignored so a
//! stray `"key": null` cannot erase a default.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{BackendChoice, BackendSettings, TriageSettings};

/// Load settings from `path`, then apply environment overrides.
///
/// A missing file is not an error (defaults apply); a file that exists but
/// is not valid JSON is.
pub fn load_settings_from_path(path: &Path) -> Result<TriageSettings> {
    let defaults = serde_json::to_value(TriageSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "merging settings file over defaults");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "no settings file, defaults only");
        defaults
    };

    let mut settings: TriageSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Fold `overlay` onto `base`.
///
/// Two objects merge entry by entry, recursing into shared keys. Anything
/// else (arrays, scalars, or an overlay replacing a non-object) resolves to
/// the overlay value. Null overlay entries leave the base entry in place.
#[must_use]
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut merged), Value::Object(incoming)) => {
            for (key, value) in incoming.into_iter().filter(|(_, v)| !v.is_null()) {
                let entry = match merged.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                merged.insert(key, entry);
            }
            Value::Object(merged)
        }
        (_, replacement) => replacement,
    }
}

/// Apply `VIGIL_*` environment overrides to loaded settings.
///
/// Invalid values are silently ignored (fall back to file/default).
pub fn apply_env_overrides(settings: &mut TriageSettings) {
    apply_backend_env("VIGIL_REASONING", &mut settings.reasoning);
    apply_backend_env("VIGIL_COMMUNICATION", &mut settings.communication);

    // ── Circuit breaker ─────────────────────────────────────────────
    if let Some(v) = read_env_u32("VIGIL_CIRCUIT_FAILURES_THRESHOLD", 1, 100) {
        settings.circuit.failures_threshold = v;
    }
    if let Some(v) = read_env_u64("VIGIL_CIRCUIT_COOLDOWN_MS", 0, 3_600_000) {
        settings.circuit.cooldown_ms = v;
    }
    if let Some(v) = read_env_u64("VIGIL_CIRCUIT_WINDOW_MS", 1000, 3_600_000) {
        settings.circuit.window_ms = v;
    }

    // ── Policy pack ─────────────────────────────────────────────────
    if let Some(v) = read_env_string("VIGIL_POLICY_PACK_PATH") {
        settings.policy.pack_path = Some(v);
    }
    if let Some(v) = read_env_u64("VIGIL_POLICY_TOP_K", 1, 50) {
        settings.policy.top_k = usize::try_from(v).unwrap_or(2);
    }

    // ── PHI guard / request limits ──────────────────────────────────
    if let Some(v) = read_env_bool("VIGIL_PHI_GUARD_ENABLED") {
        settings.phi_guard.enabled = v;
    }
    if let Some(v) = read_env_u64("VIGIL_REQUEST_MAX_BYTES", 1024, 1_073_741_824) {
        settings.request.max_bytes = usize::try_from(v).unwrap_or(settings.request.max_bytes);
    }
    if let Some(v) = read_env_u64("VIGIL_REQUEST_DEADLINE_MS", 100, 600_000) {
        settings.request.deadline_ms = v;
    }
}

fn apply_backend_env(prefix: &str, backend: &mut BackendSettings) {
    if let Some(v) = read_env_string(&format!("{prefix}_BACKEND")) {
        match v.to_lowercase().as_str() {
            "deterministic" => backend.backend = BackendChoice::Deterministic,
            "external" => backend.backend = BackendChoice::External,
            _ => {}
        }
    }
    if let Some(v) = read_env_string(&format!("{prefix}_BASE_URL")) {
        backend.base_url = v;
    }
    if let Some(v) = read_env_string(&format!("{prefix}_MODEL")) {
        backend.model = v;
    }
    if let Some(v) = read_env_string(&format!("{prefix}_API_KEY")) {
        backend.api_key = Some(v);
    }
    if let Some(v) = read_env_u64(&format!("{prefix}_TIMEOUT_MS"), 100, 600_000) {
        backend.timeout_ms = v;
    }
    if let Some(v) = read_env_u32(&format!("{prefix}_MAX_RETRIES"), 0, 5) {
        backend.max_retries = v;
    }
    if let Some(v) = read_env_u64(&format!("{prefix}_RETRY_BACKOFF_MS"), 0, 60_000) {
        backend.retry_backoff_ms = v;
    }
    if let Some(v) = read_env_f64(&format!("{prefix}_TEMPERATURE"), 0.0, 2.0) {
        backend.temperature = v;
    }
    if let Some(v) = read_env_u32(&format!("{prefix}_MAX_TOKENS"), 1, 100_000) {
        backend.max_tokens = v;
    }
    if let Some(v) = read_env_bool(&format!("{prefix}_SEND_IMAGES")) {
        backend.send_images = v;
    }
    if let Some(v) = read_env_u64(&format!("{prefix}_MAX_IMAGES"), 0, 16) {
        backend.max_images = usize::try_from(v).unwrap_or(backend.max_images);
    }
}

// ── Value parsing (pure, no environment access) ─────────────────────────────

/// Truthy spellings accepted by [`parse_bool`].
const TRUTHY: &[&str] = &["true", "1", "yes", "on"];
/// Falsy spellings accepted by [`parse_bool`].
const FALSY: &[&str] = &["false", "0", "no", "off"];

/// Parse a permissive, case-insensitive boolean.
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    let lowered = raw.trim().to_lowercase();
    if TRUTHY.contains(&lowered.as_str()) {
        return Some(true);
    }
    if FALSY.contains(&lowered.as_str()) {
        return Some(false);
    }
    None
}

/// Parse a string as a `u64` within a range.
#[must_use]
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as a `u32` within a range.
#[must_use]
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as an `f64` within a range.
#[must_use]
pub fn parse_f64_range(val: &str, min: f64, max: f64) -> Option<f64> {
    let n: f64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn read_env_string(name: &str) -> Option<String> {
    let v = std::env::var(name).ok()?;
    let trimmed = v.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn read_env_bool(name: &str) -> Option<bool> {
    parse_bool(&std::env::var(name).ok()?)
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    parse_u64_range(&std::env::var(name).ok()?, min, max)
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    parse_u32_range(&std::env::var(name).ok()?, min, max)
}

fn read_env_f64(name: &str, min: f64, max: f64) -> Option<f64> {
    parse_f64_range(&std::env::var(name).ok()?, min, max)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
