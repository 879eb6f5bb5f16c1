//! # Event subscribers for the bootvisor runtime.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] fan-out
//! used by the orchestrator to deliver [`Event`](crate::Event)s to user code.
//!
//! ## Architecture
//! ```text
//! Store / RetryObserver ── publish(Event) ──► Bus ──► subscriber_listener
//!                                                          │
//!                                                   SubscriberSet::emit
//!                                              ┌───────────┼───────────┐
//!                                              ▼           ▼           ▼
//!                                          [queue S1]  [queue S2]  [queue SN]
//!                                              ▼           ▼           ▼
//!                                          LogWriter    Metrics      Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use bootvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct FailureAlert;
//!
//! #[async_trait]
//! impl Subscribe for FailureAlert {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::CriticalFailure {
//!             // page someone
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "failure-alert"
//!     }
//! }
//! ```

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod embedded;

pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
