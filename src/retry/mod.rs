//! # Retry Execution
//!
//! Bounded-retry execution with exponential backoff and jitter for vault
//! calls. Errors are classified by [`ErrorKind`] against the policy's
//! retryable set; anything else propagates immediately.
//!
//! Each `execute` call owns its attempt counter; there is no shared mutable
//! state between concurrent invocations.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::errors::{ErrorKind, Result};

/// Retry policy shared read-only across calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt.
    pub max_retries: u32,
    /// Base backoff in seconds; attempt `n` waits `backoff_factor * 2^n`
    /// plus jitter.
    pub backoff_factor: f64,
    /// Jitter as a fraction of the computed backoff, drawn uniformly.
    pub jitter_factor: f64,
    /// Error kinds that are worth retrying.
    pub retryable_kinds: HashSet<ErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 0.5,
            jitter_factor: 0.5,
            retryable_kinds: HashSet::from([ErrorKind::Connection]),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retries() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    /// Whether an error of this kind should be retried.
    pub fn is_retryable(&self, kind: ErrorKind) -> bool {
        self.retryable_kinds.contains(&kind)
    }

    /// Backoff delay before the retry following `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.backoff_factor * f64::powi(2.0, attempt as i32);
        let jitter_bound = base * self.jitter_factor;
        let jitter = if jitter_bound > 0.0 {
            rand::thread_rng().gen_range(0.0..jitter_bound)
        } else {
            0.0
        };
        Duration::from_secs_f64(base + jitter)
    }
}

/// Runs operations under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation`, retrying on retryable failures until the policy is
    /// exhausted. The closure is invoked once per attempt and must produce a
    /// fresh future each time.
    ///
    /// On exhaustion or a non-retryable error, the last error propagates
    /// as-is.
    pub async fn execute<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let retryable = self.policy.is_retryable(error.kind());
                    if !retryable || attempt >= self.policy.max_retries {
                        return Err(error);
                    }
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Operation failed, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
