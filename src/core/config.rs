//! # Global orchestrator configuration.
//!
//! Provides [`Config`], the centralized settings for the orchestrator runtime.
//!
//! Config is used in two ways:
//! 1. **Orchestrator creation**: `Orchestrator::builder(config)`
//! 2. **ServiceSpec defaults**: `ServiceSpec::effective_retry(&config)`
//!
//! ## Sentinel values
//! - `timeout = 0s` → no per-attempt timeout
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::policies::RetryPolicy;

/// Global configuration for the orchestrator runtime.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `retry`: Default retry policy (can be overridden per service)
/// - `timeout`: Default per-attempt timeout (`0s` = no timeout)
///
/// ## Notes
/// All fields are public. Prefer the helper accessors over sprinkling sentinel
/// checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Subscribers that lag behind more than `bus_capacity` messages skip older items.
    pub bus_capacity: usize,

    /// Default retry policy for services without an override.
    pub retry: RetryPolicy,

    /// Default per-attempt timeout.
    ///
    /// Applies only when neither the descriptor nor the retry policy sets one.
    pub timeout: Duration,
}

impl Config {
    /// Returns the default per-attempt timeout as an `Option`.
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `retry = RetryPolicy::default()` (3 attempts, 1s × 1.5ⁿ capped at 30s)
    /// - `timeout = 0s` (no timeout)
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            retry: RetryPolicy::default(),
            timeout: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels() {
        let mut cfg = Config::default();
        assert_eq!(cfg.default_timeout(), None);
        cfg.timeout = Duration::from_secs(5);
        assert_eq!(cfg.default_timeout(), Some(Duration::from_secs(5)));

        cfg.bus_capacity = 0;
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
