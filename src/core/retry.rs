//! # Retry manager.
//!
//! [`retry_with_backoff`] wraps any fallible async operation with a bounded
//! attempt budget, per-attempt timeout and exponential backoff. It knows nothing
//! about services or the store: attempt progress leaves through a
//! [`RetryObserver`].
//!
//! ## Loop
//! ```text
//! loop {
//!   ├─► token cancelled?             → Err(Canceled)
//!   ├─► attempt += 1, on_attempt
//!   ├─► run_once(op, token, timeout)
//!   │     ├─ Ok(v)                    → return Ok(v)
//!   │     ├─ Err(not retryable)       → on_exhausted, return Err(e)
//!   │     ├─ Err(e), attempt == max   → on_exhausted, Err(MaxRetriesExceeded)
//!   │     └─ Err(e)                   → delay = backoff.next(attempt)
//!   │                                   on_retry(e, delay)
//!   └─► sleep(delay) (cancellable)
//! }
//! ```
//!
//! ## Rules
//! - Attempts run **sequentially** (never concurrent for one invocation)
//! - `Timeout` counts toward the budget and is backed off like any other failure
//! - `Fatal` stops immediately and is returned unwrapped

use std::future::Future;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::core::runner::run_once;
use crate::error::InitError;
use crate::policies::RetryPolicy;

/// Side channel for attempt progress. Every method defaults to a no-op.
pub trait RetryObserver: Send + Sync {
    /// Attempt `attempt` (1-based) is about to run.
    fn on_attempt(&self, _key: &str, _attempt: u32) {}

    /// Attempt `attempt` failed with `error`; the next one starts after `delay`.
    fn on_retry(&self, _key: &str, _attempt: u32, _error: &InitError, _delay: Duration) {}

    /// No further attempts; `error` is what the caller receives.
    fn on_exhausted(&self, _key: &str, _attempts: u32, _error: &InitError) {}
}

impl RetryObserver for () {}

/// Runs `operation` until it succeeds, the budget of `policy` is spent, a
/// non-retryable error occurs, or `token` is cancelled.
///
/// `operation` is called once per attempt with a child of `token` that is
/// cancelled when the attempt times out.
///
/// # Example
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use bootvisor::{BackoffPolicy, InitError, RetryPolicy, retry_with_backoff};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// let policy = RetryPolicy::default()
///     .with_backoff(BackoffPolicy::constant(Duration::from_millis(1)));
/// let mut calls = 0;
/// let out = retry_with_backoff("db", &policy, &(), &CancellationToken::new(), |_ctx| {
///     calls += 1;
///     let n = calls;
///     async move { if n < 2 { Err(InitError::application("not yet")) } else { Ok(n) } }
/// })
/// .await;
/// assert_eq!(out, Ok(2));
/// # }
/// ```
pub async fn retry_with_backoff<T, F, Fut, O>(
    key: &str,
    policy: &RetryPolicy,
    observer: &O,
    token: &CancellationToken,
    mut operation: F,
) -> Result<T, InitError>
where
    F: FnMut(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, InitError>>,
    O: RetryObserver + ?Sized,
{
    let max = policy.attempts();
    let timeout = policy.timeout();
    let mut attempt: u32 = 0;

    loop {
        if token.is_cancelled() {
            return Err(InitError::Canceled);
        }
        attempt += 1;
        observer.on_attempt(key, attempt);

        let err = match run_once(&mut operation, token, timeout).await {
            Ok(v) => return Ok(v),
            Err(InitError::Canceled) if token.is_cancelled() => return Err(InitError::Canceled),
            Err(e) => e,
        };

        if !err.is_retryable() {
            observer.on_exhausted(key, attempt, &err);
            return Err(err);
        }
        if attempt >= max {
            let err = InitError::MaxRetriesExceeded {
                key: key.to_string(),
                attempts: attempt,
                last_error: Box::new(err),
            };
            observer.on_exhausted(key, attempt, &err);
            return Err(err);
        }

        let delay = policy.backoff.next(attempt);
        observer.on_retry(key, attempt, &err, delay);

        let sleep = time::sleep(delay);
        tokio::pin!(sleep);
        select! {
            _ = &mut sleep => {}
            _ = token.cancelled() => return Err(InitError::Canceled),
        }
    }
}
