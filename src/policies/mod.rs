//! Retry policies.
//!
//! This module groups the knobs that control **how many times** a service
//! initialization is attempted and **how long** to wait between attempts.
//!
//! ## Contents
//! - [`RetryPolicy`]   attempt budget + backoff + per-attempt timeout
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid thundering herd
//!
//! ## Quick wiring
//! ```text
//! ServiceSpec { descriptor.timeout, retry: Option<RetryPolicy> }
//!      └─► Orchestrator resolves the effective RetryPolicy (spec override or Config)
//!           └─► core::retry::retry_with_backoff uses:
//!                 - max_attempts to decide retry/exhausted
//!                 - backoff.next(attempts) to schedule the next attempt
//!                 - attempt_timeout to bound every attempt
//! ```
//!
//! ## Defaults
//! - `RetryPolicy::default()` → 3 attempts, no per-attempt timeout.
//! - `BackoffPolicy::default()` → first=1s, factor=1.5, max=30s, jitter=None.

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
