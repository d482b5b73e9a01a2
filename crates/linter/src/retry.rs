//! Retrying transient failures with exponential backoff.
use crate::error::LintError;
use std::time::Duration;

/// Default number of retry attempts.
pub const DEFAULT_RETRIES: u32 = 2;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retries: u32,
    /// Delay before the first retry; doubled for every further retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// A policy that runs the operation once
    #[must_use]
    pub const fn none() -> Self {
        Self {
            retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Delay before retry number `attempt` (1-based): base, 2x base, 4x base, ...
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1_u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or runs out of retries
    pub fn run<T, E, F>(&self, is_retryable: impl Fn(&E) -> bool, mut op: F) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnMut() -> Result<T, E>,
    {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Operation failed");
                    if attempt >= self.retries || !is_retryable(&e) {
                        return Err(e);
                    }
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    tracing::info!(attempt, delay_ms = delay.as_millis(), "Retrying after delay");
                    std::thread::sleep(delay);
                }
            }
        }
    }
}

/// Retry an operation whose failures are [`LintError`]s, retrying only transient ones
pub fn retry_with_backoff<T>(
    policy: RetryPolicy,
    op: impl FnMut() -> Result<T, LintError>,
) -> Result<T, LintError> {
    policy.run(LintError::is_transient, op)
}
