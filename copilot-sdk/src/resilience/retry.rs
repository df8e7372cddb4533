//! Retry with exponential backoff for recoverable errors
//!
//! Transient failures (network, timeout, rate limit) are retried with
//! exponential backoff; every other category fails immediately.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff};

use crate::error::{Result, ServiceError};

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 means no retries)
    pub max_retries: u32,

    /// Initial backoff duration
    pub initial_interval: Duration,

    /// Maximum backoff duration
    pub max_interval: Duration,

    /// Multiplier for backoff between retries
    pub multiplier: f64,

    /// Randomization applied to each interval (0.0-1.0)
    pub randomization_factor: f64,

    /// Maximum total time to spend retrying
    pub max_elapsed_time: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
            randomization_factor: 0.2,
            max_elapsed_time: Some(Duration::from_secs(30)),
        }
    }
}

impl RetryConfig {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            current_interval: self.initial_interval,
            max_interval: self.max_interval,
            multiplier: self.multiplier,
            randomization_factor: self.randomization_factor,
            max_elapsed_time: self.max_elapsed_time,
            ..ExponentialBackoff::default()
        }
    }
}

impl fmt::Display for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RetryConfig {{ max_retries: {}, initial_interval: {:?}, max_interval: {:?}, multiplier: {} }}",
            self.max_retries, self.initial_interval, self.max_interval, self.multiplier
        )
    }
}

/// Executor for retry operations with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Run `operation` until it succeeds, fails permanently, or the retry
    /// budget is spent. The closure is called once per attempt.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = self.config.backoff();
        let mut attempts = 0;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() || attempts >= self.config.max_retries {
                return if attempts > 0 {
                    Err(err.with_context_value("attempts", attempts + 1))
                } else {
                    Err(err)
                };
            }

            let Some(delay) = backoff.next_backoff() else {
                return Err(err.with_context_value("attempts", attempts + 1));
            };

            attempts += 1;
            log::warn!(
                "Retryable failure, retrying in {:?} (attempt {}/{}): {}",
                delay,
                attempts,
                self.config.max_retries,
                err
            );
            tokio::time::sleep(delay).await;
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
