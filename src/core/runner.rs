//! # Run a single initialization attempt.
//!
//! - **Execute ONE attempt** with a child cancellation token
//! - **Apply timeout** if configured (wraps execution in `tokio::time::timeout`)
//!
//! ```text
//! Success:   op(child) → Ok(v)
//! Failure:   op(child) → Err(e)
//! Timeout:   timeout exceeded → cancel child → Err(Timeout { timeout })
//! ```
//!
//! ## Rules
//! - Derives a **child token** per attempt (isolated cancellation)
//! - Child cancellation does **not** affect the parent
//! - Parent cancellation while the attempt runs yields `Err(Canceled)` even if the
//!   operation ignores its token

use std::future::Future;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::InitError;

/// Executes a single attempt of `op` with an optional timeout.
pub async fn run_once<T, F, Fut>(
    op: &mut F,
    parent: &CancellationToken,
    timeout: Option<Duration>,
) -> Result<T, InitError>
where
    F: FnMut(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, InitError>>,
{
    let child = parent.child_token();
    let attempt = op(child.clone());

    let res = match timeout.filter(|d| *d > Duration::ZERO) {
        Some(dur) => {
            tokio::select! {
                biased;
                _ = parent.cancelled() => Err(InitError::Canceled),
                r = time::timeout(dur, attempt) => match r {
                    Ok(r) => r,
                    Err(_elapsed) => Err(InitError::Timeout { timeout: dur }),
                },
            }
        }
        None => {
            tokio::select! {
                biased;
                _ = parent.cancelled() => Err(InitError::Canceled),
                r = attempt => r,
            }
        }
    };

    child.cancel();
    res
}
