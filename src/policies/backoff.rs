//! # Backoff policy for retrying service initialization.
//!
//! [`BackoffPolicy`] controls how the delay between two attempts grows after
//! repeated failures. The delay scheduled after `attempts` failed attempts is
//! `first × factor^attempts`, clamped to `max`, then jittered.
//!
//! The base is derived from the attempt count alone, so jitter output never feeds
//! back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use bootvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(1000),
//!     max: Duration::from_secs(10),
//!     factor: 1.5,
//!     jitter: JitterPolicy::None,
//! };
//!
//! // After the first failed attempt: 1000ms × 1.5
//! assert_eq!(backoff.next(1), Duration::from_millis(1500));
//! // After the second: 1000ms × 1.5² = 2250ms
//! assert_eq!(backoff.next(2), Duration::from_millis(2250));
//! // Far out: capped at max
//! assert_eq!(backoff.next(20), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Base delay (`factor^0` term).
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter applied after clamping.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a strategy with:
    /// - `first = 1s`;
    /// - `factor = 1.5`;
    /// - `max = 30s`;
    /// - no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(1000),
            max: Duration::from_secs(30),
            factor: 1.5,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Constant delay of `delay` between attempts, no jitter.
    pub fn constant(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Delay to sleep after `attempts` attempts have failed.
    ///
    /// `min(first × factor^attempts, max)`; non-finite or negative intermediate
    /// values fall back to `max`.
    pub fn next(&self, attempts: u32) -> Duration {
        let base = self.base(attempts);
        match self.jitter {
            JitterPolicy::Decorrelated => {
                let prev = self.base(attempts.saturating_sub(1));
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), prev, self.max)
            }
            other => other.apply(base),
        }
    }

    fn base(&self, attempts: u32) -> Duration {
        let exp = i32::try_from(attempts).unwrap_or(i32::MAX);
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);
        if secs.is_finite() && secs >= 0.0 && secs <= self.max.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max
        }
    }
}
