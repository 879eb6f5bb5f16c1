//! # Runtime events emitted by the store and the retry loop.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Transition events**: one per committed store action (initializing, ready, failed, ...)
//! - **Attempt events**: per-attempt progress reported by the retry loop
//! - **Aggregate events**: system-wide flags flipping (`SystemReady`, `CriticalFailure`)
//! - **Subscriber events**: overflow / panic inside subscriber workers
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Transition events are published while the store's write lock is held, so their
//! `seq` order is the commit order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use bootvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_service("db")
//!     .with_reason("connection refused")
//!     .with_attempt(2)
//!     .with_delay(Duration::from_millis(2250));
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.service.as_deref(), Some("db"));
//! assert_eq!(ev.delay_ms, Some(2250));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Transition events (published by the store) ===
    /// A service record was created.
    ///
    /// Sets: `service`.
    ServiceRegistered,

    /// A service entered `Initializing` (first attempt or retry).
    ///
    /// Sets: `service`, `attempt` (1 for the first attempt).
    ServiceInitializing,

    /// A service reached `Ready`.
    ///
    /// Sets: `service`.
    ServiceReady,

    /// An attempt failed and the service went to `Error` (a retry will follow).
    ///
    /// Sets: `service`, `attempt` (retry count so far), `reason`.
    ServiceErrored,

    /// A service reached terminal `Failed`.
    ///
    /// Sets: `service`, `attempt` (retry count), `reason`, `critical`.
    ServiceFailed,

    /// A service is waiting on dependencies.
    ///
    /// Sets: `service`, `reason` (blocking ids), `blocked_by_failure`.
    ServiceBlocked,

    /// An in-flight initialization was abandoned on shutdown; the record is `Pending` again.
    ///
    /// Sets: `service`.
    ServiceAborted,

    /// A single service record was reset to `Pending`.
    ///
    /// Sets: `service`.
    ServiceReset,

    /// The whole store was reset.
    StoreReset,

    /// A late result for a reset record was ignored.
    ///
    /// Sets: `service`, `reason` (action name).
    StaleUpdateIgnored,

    // === Attempt events (published by the retry observer) ===
    /// One attempt failed.
    ///
    /// Sets: `service`, `attempt`, `reason`.
    AttemptFailed,

    /// One attempt exceeded its timeout (always followed by `AttemptFailed`).
    ///
    /// Sets: `service`, `attempt`, `timeout_ms`.
    TimeoutHit,

    /// Next attempt scheduled.
    ///
    /// Sets: `service`, `attempt` (the failed one), `delay_ms`, `reason`.
    BackoffScheduled,

    // === Aggregate events ===
    /// Every registered service is `Ready`.
    SystemReady,

    /// A critical-path service failed terminally.
    ///
    /// Sets: `service`, `reason`.
    CriticalFailure,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `service` (subscriber name), `reason` (panic info).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `service` (subscriber name), `reason` ("full" / "closed").
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Service id (or subscriber name for subscriber events).
    pub service: Option<Arc<str>>,
    /// Attempt number or retry count.
    pub attempt: Option<u32>,
    /// Attempt timeout in milliseconds.
    pub timeout_ms: Option<u32>,
    /// Backoff delay before the next attempt in milliseconds.
    pub delay_ms: Option<u32>,
    /// Human-readable reason (error message, blocking ids, ...).
    pub reason: Option<Arc<str>>,
    /// Whether the service is on the critical path.
    pub critical: bool,
    /// For `ServiceBlocked`: an upstream dependency failed.
    pub blocked_by_failure: bool,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            attempt: None,
            timeout_ms: None,
            delay_ms: None,
            reason: None,
            critical: false,
            blocked_by_failure: false,
        }
    }

    /// Attaches a service id.
    #[inline]
    pub fn with_service(mut self, id: impl Into<Arc<str>>) -> Self {
        self.service = Some(id.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    /// Marks the event as concerning a critical-path service.
    #[inline]
    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    /// Marks a `ServiceBlocked` event as caused by a failed dependency.
    #[inline]
    pub fn with_blocked_by_failure(mut self, by_failure: bool) -> Self {
        self.blocked_by_failure = by_failure;
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_service(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_service(subscriber)
            .with_reason(info)
    }

    /// True for events raised by subscriber workers themselves.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

fn compact_ms(d: Duration) -> u32 {
    u32::try_from(d.as_millis()).unwrap_or(u32::MAX)
}
