//! # Jitter policy for retry delays.
//!
//! Several services failing at once (say, all waiting on the same database) would
//! otherwise retry in lockstep. [`JitterPolicy`] spreads them out.

use rand::Rng;
use std::time::Duration;

/// Randomization applied to a backoff delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Exact backoff delay. Deterministic; the default.
    #[default]
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// `delay/2 + uniform[0, delay/2]`.
    Equal,
    /// Uniform in `[first, min(prev × 3, max)]`; see [`apply_decorrelated`](Self::apply_decorrelated).
    Decorrelated,
}

impl JitterPolicy {
    /// Applies jitter to `delay` using the thread-local RNG.
    ///
    /// `Decorrelated` needs more context and returns `delay` unchanged here.
    pub fn apply(&self, delay: Duration) -> Duration {
        self.apply_with(&mut rand::rng(), delay)
    }

    /// Same as [`apply`](Self::apply) with an explicit RNG.
    pub fn apply_with<R: Rng + ?Sized>(&self, rng: &mut R, delay: Duration) -> Duration {
        let ms = millis(delay);
        match self {
            JitterPolicy::None | JitterPolicy::Decorrelated => delay,
            _ if ms == 0 => Duration::ZERO,
            JitterPolicy::Full => Duration::from_millis(rng.random_range(0..=ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                Duration::from_millis(half + rng.random_range(0..=half))
            }
        }
    }

    /// Decorrelated jitter: uniform in `[floor, min(prev × 3, max)]`.
    ///
    /// Other variants fall back to `apply(prev)`.
    pub fn apply_decorrelated(&self, floor: Duration, prev: Duration, max: Duration) -> Duration {
        if *self != JitterPolicy::Decorrelated {
            return self.apply(prev);
        }
        let lo = millis(floor);
        let hi = millis(prev).saturating_mul(3).min(millis(max)).max(lo);
        if lo == hi {
            return floor;
        }
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
