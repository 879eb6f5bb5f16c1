//! # LogWriter: events as `tracing` records
//!
//! Renders every [`Event`] through `tracing` with structured fields. Install any
//! `tracing` subscriber in the application to see them.
//!
//! ## Example output (with `tracing-subscriber`'s fmt layer)
//! ```text
//! INFO  bootvisor: initializing service="db" attempt=1
//! WARN  bootvisor: attempt failed service="db" attempt=1 err="connection refused"
//! INFO  bootvisor: backoff scheduled service="db" delay_ms=1500 after_attempt=1
//! INFO  bootvisor: ready service="db"
//! INFO  bootvisor: blocked service="api" waiting_on="cache" by_failure=true
//! ERROR bootvisor: critical failure service="auth" err="..."
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let service = e.service.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::ServiceRegistered => {
                tracing::debug!(target: "bootvisor", service, "registered");
            }
            EventKind::ServiceInitializing => {
                tracing::info!(target: "bootvisor", service, attempt = e.attempt, "initializing");
            }
            EventKind::ServiceReady => {
                tracing::info!(target: "bootvisor", service, "ready");
            }
            EventKind::ServiceErrored => {
                tracing::debug!(target: "bootvisor", service, retries = e.attempt, err = reason, "errored");
            }
            EventKind::ServiceFailed => {
                tracing::error!(
                    target: "bootvisor",
                    service,
                    retries = e.attempt,
                    critical = e.critical,
                    err = reason,
                    "failed"
                );
            }
            EventKind::ServiceBlocked => {
                tracing::info!(
                    target: "bootvisor",
                    service,
                    waiting_on = reason,
                    by_failure = e.blocked_by_failure,
                    "blocked"
                );
            }
            EventKind::ServiceAborted => {
                tracing::warn!(target: "bootvisor", service, "initialization abandoned");
            }
            EventKind::ServiceReset => {
                tracing::info!(target: "bootvisor", service, "reset");
            }
            EventKind::StoreReset => {
                tracing::info!(target: "bootvisor", "store reset");
            }
            EventKind::StaleUpdateIgnored => {
                tracing::debug!(target: "bootvisor", service, action = reason, "stale update ignored");
            }
            EventKind::AttemptFailed => {
                tracing::warn!(target: "bootvisor", service, attempt = e.attempt, err = reason, "attempt failed");
            }
            EventKind::TimeoutHit => {
                tracing::warn!(target: "bootvisor", service, attempt = e.attempt, timeout_ms = e.timeout_ms, "attempt timed out");
            }
            EventKind::BackoffScheduled => {
                tracing::info!(
                    target: "bootvisor",
                    service,
                    delay_ms = e.delay_ms,
                    after_attempt = e.attempt,
                    "backoff scheduled"
                );
            }
            EventKind::SystemReady => {
                tracing::info!(target: "bootvisor", "system ready");
            }
            EventKind::CriticalFailure => {
                tracing::error!(target: "bootvisor", service, err = reason, "critical failure");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                tracing::warn!(target: "bootvisor", subscriber = service, reason, kind = ?e.kind, "subscriber issue");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
