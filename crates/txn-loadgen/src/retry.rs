//! Backoff for access-node reads.
//!
//! Two places retry. The REST client wraps each idempotent read (block
//! headers, sequence numbers, transaction results) in [`RetryScope::Read`].
//! The submission engine wraps the sequence-number fetch that ends a resync
//! in [`RetryScope::Resync`]; a resync that gives up halts the account, so
//! that scope keeps going through failures a single read would report.
//!
//! Submissions are never retried: a second submit could spend the same
//! sequence number twice.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use txn_loadgen::retry::RetryConfig;
//!
//! let config = RetryConfig::new(5, Duration::from_millis(100))
//!     .with_max_delay(Duration::from_secs(10));
//! assert_eq!(config.max_retries, 5);
//! assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
//! ```

use crate::error::{LoadError, LoadResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Backoff schedule: the delay doubles per attempt up to `max_delay`, then
/// moves by up to `jitter_factor` of itself in either direction.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 = fail fast).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Ceiling on any single delay.
    pub max_delay: Duration,
    /// Jitter as a fraction of the delay, 0.0 to 1.0.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter_factor: 0.5,
        }
    }
}

impl RetryConfig {
    /// A schedule of `max_retries` retries starting at `initial_delay`.
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            ..Self::default()
        }
    }

    /// Fail fast.
    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Short delays and more attempts, for a local emulator.
    pub fn emulator() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
            jitter_factor: 0.3,
        }
    }

    /// Long delays, for shared public access nodes.
    pub fn public_network() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter_factor: 0.5,
        }
    }

    /// Sets the delay ceiling.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Makes delays exact.
    pub fn without_jitter(mut self) -> Self {
        self.jitter_factor = 0.0;
        self
    }

    /// Delay before retry number `attempt` (1-based); zero for attempt 0.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let doubled = self
            .initial_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(31));
        let capped = doubled.min(self.max_delay);

        let factor = self.jitter_factor.clamp(0.0, 1.0);
        if factor == 0.0 {
            return capped;
        }
        let offset = rand::random::<f64>() * 2.0 - 1.0;
        capped.mul_f64((1.0 + offset * factor).max(0.0))
    }
}

/// What is being retried, which decides the failures worth another attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryScope {
    /// One idempotent read. Timeouts, refused connections and overloaded
    /// or failing servers are retried; everything else is an answer.
    Read,
    /// The sequence-number fetch of a resync. Any transport or decode
    /// failure and any server error is retried. Client errors such as an
    /// unknown account or key are not.
    Resync,
}

impl RetryScope {
    /// Returns true if `error` is worth another attempt in this scope.
    pub fn should_retry(self, error: &LoadError) -> bool {
        match self {
            Self::Read => error.is_retryable(),
            Self::Resync => {
                error.is_retryable()
                    || matches!(error, LoadError::Http(_) | LoadError::Json(_))
                    || matches!(error, LoadError::Api { status_code, .. } if *status_code >= 500)
            }
        }
    }
}

/// Runs an async operation under a [`RetryConfig`] and a [`RetryScope`].
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
    scope: RetryScope,
}

impl RetryExecutor {
    /// Creates an executor.
    pub fn new(config: RetryConfig, scope: RetryScope) -> Self {
        Self { config, scope }
    }

    /// Runs `operation` until it succeeds, fails with an error the scope
    /// does not retry, or runs out of retries. The last error is returned.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> LoadResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = LoadResult<T>>,
    {
        let mut attempt = 0;
        loop {
            let error = match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };
            if attempt >= self.config.max_retries || !self.scope.should_retry(&error) {
                return Err(error);
            }

            attempt += 1;
            let delay = self.config.delay_for_attempt(attempt);
            debug!(
                scope = ?self.scope,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying"
            );
            if !delay.is_zero() {
                sleep(delay).await;
            }
        }
    }
}
