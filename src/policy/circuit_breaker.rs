//! Circuit breaker for upstream failure isolation, one breaker per route
//! path.
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= error_threshold
//! Open → HalfOpen: allowance check after timeout_ms since last failure
//! HalfOpen → Closed: first success
//! HalfOpen → Open: any failure
//! ```
//!
//! The gate (`allow`) and the recorders run as separate critical sections;
//! a probe raced past a concurrent state flip costs at most one extra
//! failed attempt.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::routing::route::BreakerPolicy;

/// Breaker status for one route path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerStatus {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerState {
    status: BreakerStatus,
    failures: u32,
    last_failure: Instant,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            status: BreakerStatus::Closed,
            failures: 0,
            last_failure: Instant::now(),
        }
    }
}

/// Per-path circuit breakers. States are created lazily on first gate
/// check and survive route-table replacements.
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    states: Mutex<HashMap<String, BreakerState>>,
}

impl BreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate check, consulted before forwarding. An open breaker flips to
    /// half-open (and admits the probe) once `timeout_ms` has elapsed
    /// since the last failure.
    pub fn allow(&self, path: &str, policy: &BreakerPolicy) -> bool {
        let mut states = self.states.lock().expect("breaker mutex poisoned");
        let state = states
            .entry(path.to_string())
            .or_insert_with(BreakerState::new);

        match state.status {
            BreakerStatus::Open => {
                if state.last_failure.elapsed() >= Duration::from_millis(policy.timeout_ms) {
                    state.status = BreakerStatus::HalfOpen;
                    info!(path = %path, "circuit breaker half-open, admitting probe");
                    true
                } else {
                    false
                }
            }
            BreakerStatus::Closed | BreakerStatus::HalfOpen => true,
        }
    }

    /// Record a successful attempt (status < 500).
    pub fn record_success(&self, path: &str) {
        let mut states = self.states.lock().expect("breaker mutex poisoned");
        let Some(state) = states.get_mut(path) else {
            return;
        };

        match state.status {
            BreakerStatus::HalfOpen => {
                state.status = BreakerStatus::Closed;
                state.failures = 0;
                info!(path = %path, "circuit breaker closed after successful probe");
            }
            BreakerStatus::Closed => {
                state.failures = 0;
            }
            BreakerStatus::Open => {}
        }
    }

    /// Record a failed attempt (status >= 500 or a transport error).
    pub fn record_failure(&self, path: &str, policy: &BreakerPolicy) {
        let mut states = self.states.lock().expect("breaker mutex poisoned");
        let Some(state) = states.get_mut(path) else {
            return;
        };

        state.failures += 1;
        state.last_failure = Instant::now();
        if state.failures >= policy.error_threshold && state.status != BreakerStatus::Open {
            state.status = BreakerStatus::Open;
            warn!(path = %path, failures = state.failures, "circuit breaker tripped");
        }
    }

    /// Current status for a path, if a breaker exists.
    pub fn status(&self, path: &str) -> Option<BreakerStatus> {
        self.states
            .lock()
            .expect("breaker mutex poisoned")
            .get(path)
            .map(|s| s.status)
    }
}
