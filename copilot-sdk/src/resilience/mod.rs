//! Resilience patterns for service clients
//!
//! - Retry with exponential backoff
//! - Circuit breaker
//! - Bulkhead (concurrency limit)
//! - Unified resilience facade used by every client

mod bulkhead;
mod circuit_breaker;
mod retry;

pub use bulkhead::Bulkhead;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics};
pub use retry::{RetryConfig, RetryExecutor};

use std::future::Future;
use std::sync::Arc;

use crate::error::Result;

/// Retry and circuit breaking composed around one backend
#[derive(Debug, Clone)]
pub struct Resilience {
    retry: RetryExecutor,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl Resilience {
    pub fn new(
        name: impl Into<String>,
        retry_config: RetryConfig,
        circuit_breaker_config: CircuitBreakerConfig,
    ) -> Self {
        Self {
            retry: RetryExecutor::new(retry_config),
            circuit_breaker: Arc::new(CircuitBreaker::new(name, circuit_breaker_config)),
        }
    }

    /// Default policies for the named backend
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, RetryConfig::default(), CircuitBreakerConfig::default())
    }

    /// Execute an operation with retries, checking the breaker before every
    /// attempt. Only transient failures count against the breaker.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let breaker = &self.circuit_breaker;
        self.retry
            .execute(|| {
                let attempt = breaker.check().map(|_| operation());
                async move {
                    match attempt?.await {
                        Ok(value) => {
                            breaker.record_success();
                            Ok(value)
                        }
                        Err(err) => {
                            if err.is_retryable() {
                                breaker.record_failure();
                            }
                            Err(err)
                        }
                    }
                }
            })
            .await
    }

    pub fn circuit_breaker_status(&self) -> CircuitBreakerStatus {
        self.circuit_breaker.status()
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    pub fn reset_circuit_breaker(&self) {
        self.circuit_breaker.reset();
    }
}

/// Status of a circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitBreakerStatus {
    /// Circuit is closed, allowing requests
    Closed,

    /// Circuit is open, rejecting requests
    Open,

    /// Circuit is half-open, allowing trial requests
    HalfOpen,
}

impl std::fmt::Display for CircuitBreakerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}
