//! # Retry policy for service initialization.
//!
//! [`RetryPolicy`] bounds how many times an initialization is attempted, how long
//! one attempt may run, and how the wait between attempts grows.
//!
//! ```text
//! attempt 1 ──fail──► sleep(backoff.next(1)) ──► attempt 2 ──fail──► sleep(backoff.next(2)) ──► attempt 3 ──fail──► MaxRetriesExceeded
//!     └─ each attempt bounded by attempt_timeout (elapsed → InitError::Timeout, same treatment)
//! ```

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Attempt budget, backoff and per-attempt timeout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (`0` is treated as `1`).
    pub max_attempts: u32,
    /// Delay growth between attempts.
    pub backoff: BackoffPolicy,
    /// Upper bound for a single attempt (`None` or zero = unbounded).
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    /// `max_attempts = 3`, default backoff, no timeout.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffPolicy::default(),
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    /// A policy that runs the operation exactly once.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Effective attempt budget (never below 1).
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Effective per-attempt timeout; zero collapses to `None`.
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.attempt_timeout.filter(|d| !d.is_zero())
    }

    /// Returns a copy with the given attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Returns a copy with the given backoff.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns a copy with the given per-attempt timeout.
    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }
}
