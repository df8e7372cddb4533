//! Circuit breaker for backends that keep failing
//!
//! After `failure_threshold` consecutive transient failures the breaker
//! opens and rejects calls until `reset_timeout` has passed. It then lets
//! trial calls through (half-open) and closes again after
//! `success_threshold` consecutive successes.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::{Result, ServiceError};

use super::CircuitBreakerStatus;

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before the circuit opens
    pub failure_threshold: usize,

    /// How long the circuit stays open before allowing trial requests
    pub reset_timeout: Duration,

    /// Number of successful trial requests needed to close the circuit
    pub success_threshold: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    status: CircuitBreakerStatus,
    opened_at: Option<Instant>,
    consecutive_failures: usize,
    consecutive_successes: usize,
    total_failures: usize,
    total_successes: usize,
}

impl BreakerState {
    fn closed() -> Self {
        Self {
            status: CircuitBreakerStatus::Closed,
            opened_at: None,
            consecutive_failures: 0,
            consecutive_successes: 0,
            total_failures: 0,
            total_successes: 0,
        }
    }
}

/// A thread-safe circuit breaker guarding one backend
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    state: Mutex<BreakerState>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(BreakerState::closed()),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // A panic while holding the lock leaves the counters usable, so
    // poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check whether a request may proceed
    pub fn check(&self) -> Result<()> {
        let mut state = self.lock();

        match state.status {
            CircuitBreakerStatus::Closed | CircuitBreakerStatus::HalfOpen => Ok(()),
            CircuitBreakerStatus::Open => {
                let elapsed = state.opened_at.map(|at| at.elapsed()).unwrap_or(Duration::MAX);
                if elapsed >= self.config.reset_timeout {
                    log::info!("Circuit breaker '{}' transitioning to Half-Open", self.name);
                    state.status = CircuitBreakerStatus::HalfOpen;
                    state.consecutive_successes = 0;
                    Ok(())
                } else {
                    let remaining = self.config.reset_timeout.saturating_sub(elapsed);
                    Err(ServiceError::circuit_broken(format!(
                        "'{}' is unavailable, retry in {}s",
                        self.name,
                        remaining.as_secs()
                    )))
                }
            }
        }
    }

    /// Record a successful request
    pub fn record_success(&self) {
        let mut state = self.lock();
        state.total_successes += 1;

        match state.status {
            CircuitBreakerStatus::Closed => state.consecutive_failures = 0,
            CircuitBreakerStatus::HalfOpen => {
                state.consecutive_successes += 1;
                if state.consecutive_successes >= self.config.success_threshold {
                    log::info!("Circuit breaker '{}' transitioning to Closed", self.name);
                    state.status = CircuitBreakerStatus::Closed;
                    state.opened_at = None;
                    state.consecutive_failures = 0;
                    state.consecutive_successes = 0;
                }
            }
            CircuitBreakerStatus::Open => {
                log::debug!("Circuit breaker '{}' saw a success while open", self.name);
            }
        }
    }

    /// Record a failed request
    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.total_failures += 1;

        let should_open = match state.status {
            CircuitBreakerStatus::Closed => {
                state.consecutive_failures += 1;
                state.consecutive_failures >= self.config.failure_threshold
            }
            CircuitBreakerStatus::HalfOpen => true,
            CircuitBreakerStatus::Open => false,
        };

        if should_open {
            log::warn!(
                "Circuit breaker '{}' opening after {} consecutive failures",
                self.name,
                state.consecutive_failures
            );
            state.status = CircuitBreakerStatus::Open;
            state.opened_at = Some(Instant::now());
            state.consecutive_successes = 0;
        }
    }

    /// Force the breaker back to the closed state
    pub fn reset(&self) {
        let mut state = self.lock();
        state.status = CircuitBreakerStatus::Closed;
        state.opened_at = None;
        state.consecutive_failures = 0;
        state.consecutive_successes = 0;
    }

    pub fn status(&self) -> CircuitBreakerStatus {
        self.lock().status
    }

    pub fn failure_count(&self) -> usize {
        self.lock().consecutive_failures
    }

    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let state = self.lock();
        CircuitBreakerMetrics {
            status: state.status,
            failure_count: state.consecutive_failures,
            success_count: state.consecutive_successes,
            total_failures: state.total_failures,
            total_successes: state.total_successes,
            opened_duration: state.opened_at.map(|at| at.elapsed()),
        }
    }
}

/// Point-in-time counters of a circuit breaker
#[derive(Debug, Clone)]
pub struct CircuitBreakerMetrics {
    pub status: CircuitBreakerStatus,
    pub failure_count: usize,
    pub success_count: usize,
    pub total_failures: usize,
    pub total_successes: usize,
    pub opened_duration: Option<Duration>,
}
