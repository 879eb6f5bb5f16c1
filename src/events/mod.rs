//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the state store, the retry loop and
//! subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Store` (one event per committed transition), the
//!   orchestrator's retry observer (`AttemptFailed`, `TimeoutHit`,
//!   `BackoffScheduled`), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the orchestrator's subscriber listener (fans out to
//!   `SubscriberSet`) and anything holding [`Orchestrator::events`](crate::Orchestrator::events).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
