//! Process-wide circuit breaker, one state record per endpoint.
//!
//! Failures are counted within a rolling window. At the threshold the
//! circuit opens for a cooldown; when the cooldown lapses exactly one
//! half-open probe is admitted. The probe's outcome closes or re-opens the
//! circuit.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::CircuitConfig;

/// Outcome of asking the breaker for permission to call an endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CircuitDecision {
    /// Call freely.
    Closed,
    /// Cooldown lapsed; this caller is the single probe.
    HalfOpen,
    /// Refuse the call.
    Open {
        /// Cooldown remaining. Zero while a half-open probe is in flight.
        remaining: Duration,
    },
}

#[derive(Debug, Default)]
struct EndpointState {
    failures: u32,
    last_failure: Option<Instant>,
    opened_at: Option<Instant>,
    half_open_in_flight: bool,
}

/// Shared registry of per-endpoint breaker state.
#[derive(Debug)]
pub struct CircuitRegistry {
    config: CircuitConfig,
    inner: Mutex<HashMap<String, EndpointState>>,
}

impl CircuitRegistry {
    #[must_use]
    pub fn new(config: CircuitConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Ask for permission to call `key`.
    pub fn try_acquire(&self, key: &str) -> CircuitDecision {
        let mut inner = self.inner.lock();
        let state = inner.entry(key.to_string()).or_default();

        let Some(opened_at) = state.opened_at else {
            return CircuitDecision::Closed;
        };

        let elapsed = opened_at.elapsed();
        if elapsed < self.config.cooldown {
            return CircuitDecision::Open {
                remaining: self.config.cooldown - elapsed,
            };
        }
        if state.half_open_in_flight {
            return CircuitDecision::Open {
                remaining: Duration::ZERO,
            };
        }
        state.half_open_in_flight = true;
        debug!(endpoint = key, "circuit half-open probe admitted");
        CircuitDecision::HalfOpen
    }

    /// Record a successful call: close the circuit and reset counters.
    pub fn record_success(&self, key: &str) {
        let mut inner = self.inner.lock();
        if let Some(state) = inner.get_mut(key) {
            *state = EndpointState::default();
        }
    }

    /// Record a failed call. Opens the circuit at the threshold; a failed
    /// half-open probe re-opens for a fresh cooldown.
    pub fn record_failure(&self, key: &str) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let state = inner.entry(key.to_string()).or_default();

        if state.half_open_in_flight {
            state.half_open_in_flight = false;
            state.opened_at = Some(now);
            state.last_failure = Some(now);
            warn!(endpoint = key, "circuit re-opened after failed probe");
            metrics::counter!("backend_circuit_opened_total").increment(1);
            return;
        }

        // Failures outside the rolling window no longer count.
        if state
            .last_failure
            .is_some_and(|t| now.duration_since(t) > self.config.window)
        {
            state.failures = 0;
        }
        state.failures += 1;
        state.last_failure = Some(now);

        if state.failures >= self.config.failures_threshold && state.opened_at.is_none() {
            state.opened_at = Some(now);
            warn!(
                endpoint = key,
                failures = state.failures,
                "circuit opened"
            );
            metrics::counter!("backend_circuit_opened_total").increment(1);
        }
    }

    /// Release a half-open slot without deciding the probe's outcome
    /// (used when the probe was cancelled by the caller).
    pub fn release(&self, key: &str) {
        let mut inner = self.inner.lock();
        if let Some(state) = inner.get_mut(key) {
            state.half_open_in_flight = false;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(cooldown_ms: u64) -> CircuitRegistry {
        CircuitRegistry::new(CircuitConfig {
            failures_threshold: 2,
            cooldown: Duration::from_millis(cooldown_ms),
            window: Duration::from_secs(60),
        })
    }

    #[test]
    fn closed_until_threshold() {
        let reg = registry(50);
        assert_eq!(reg.try_acquire("ep"), CircuitDecision::Closed);
        reg.record_failure("ep");
        assert_eq!(reg.try_acquire("ep"), CircuitDecision::Closed);
        reg.record_failure("ep");
        assert!(matches!(reg.try_acquire("ep"), CircuitDecision::Open { .. }));
    }

    #[test]
    fn open_reports_remaining_cooldown() {
        let reg = registry(10_000);
        reg.record_failure("ep");
        reg.record_failure("ep");
        match reg.try_acquire("ep") {
            CircuitDecision::Open { remaining } => {
                assert!(remaining > Duration::from_secs(9));
            }
            other => panic!("expected open, got {other:?}"),
        }
    }

    #[test]
    fn single_half_open_probe_per_cooldown() {
        let reg = registry(20);
        reg.record_failure("ep");
        reg.record_failure("ep");
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(reg.try_acquire("ep"), CircuitDecision::HalfOpen);
        // Second caller while the probe is in flight is refused.
        assert_eq!(
            reg.try_acquire("ep"),
            CircuitDecision::Open {
                remaining: Duration::ZERO
            }
        );
    }

    #[test]
    fn successful_probe_closes() {
        let reg = registry(20);
        reg.record_failure("ep");
        reg.record_failure("ep");
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(reg.try_acquire("ep"), CircuitDecision::HalfOpen);
        reg.record_success("ep");
        assert_eq!(reg.try_acquire("ep"), CircuitDecision::Closed);
    }

    #[test]
    fn failed_probe_reopens() {
        let reg = registry(20);
        reg.record_failure("ep");
        reg.record_failure("ep");
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(reg.try_acquire("ep"), CircuitDecision::HalfOpen);
        reg.record_failure("ep");
        assert!(matches!(
            reg.try_acquire("ep"),
            CircuitDecision::Open { remaining } if remaining > Duration::ZERO
        ));
    }

    #[test]
    fn release_frees_probe_slot() {
        let reg = registry(20);
        reg.record_failure("ep");
        reg.record_failure("ep");
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(reg.try_acquire("ep"), CircuitDecision::HalfOpen);
        reg.release("ep");
        assert_eq!(reg.try_acquire("ep"), CircuitDecision::HalfOpen);
    }

    #[test]
    fn window_expiry_resets_failure_count() {
        let reg = CircuitRegistry::new(CircuitConfig {
            failures_threshold: 2,
            cooldown: Duration::from_millis(50),
            window: Duration::from_millis(10),
        });
        reg.record_failure("ep");
        std::thread::sleep(Duration::from_millis(20));
        // First failure aged out; this one starts a fresh count.
        reg.record_failure("ep");
        assert_eq!(reg.try_acquire("ep"), CircuitDecision::Closed);
    }

    #[test]
    fn endpoints_are_independent() {
        let reg = registry(50);
        reg.record_failure("a");
        reg.record_failure("a");
        assert!(matches!(reg.try_acquire("a"), CircuitDecision::Open { .. }));
        assert_eq!(reg.try_acquire("b"), CircuitDecision::Closed);
    }
}
