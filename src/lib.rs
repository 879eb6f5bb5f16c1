//! # bootvisor
//!
//! **Bootvisor** brings up a fixed set of named application services in
//! dependency order.
//!
//! Each service declares the services it depends on and whether it is on the
//! critical path. The orchestrator starts a service only once all of its
//! dependencies are `Ready`, retries failed initializations with exponential
//! backoff, and exposes an aggregate "system ready" signal. A critical service
//! that exhausts its retries is escalated as a critical failure.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ ServiceSpec  │   │ ServiceSpec  │   │ ServiceSpec  │
//!     │ (db)         │   │ (cache: db)  │   │ (api: cache) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ServiceTable (validated: unique ids, known deps, acyclic)        │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Orchestrator (driver loop)                                       │
//! │  - resolver::can_start against the latest committed state         │
//! │  - UpdateGate (one initialization per service id at a time)       │
//! │  - retry_with_backoff (attempt budget, timeout, backoff)          │
//! └──────┬──────────────────────────────────────────────▲─────────────┘
//!        │ dispatch(Action)                             │ watch::changed
//!        ▼                                              │
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Store (single writer, reducer, generation-guarded tickets)       │
//! └──────┬───────────────────────────────────────┬────────────────────┘
//!        ▼                                       ▼
//!   StateView (watch)                  Bus (broadcast Events)
//!   is_ready / status / ...                      ▼
//!                                         SubscriberSet
//!                                    ┌───────────┼───────────┐
//!                                    ▼           ▼           ▼
//!                                LogWriter    metrics      custom
//! ```
//!
//! ### Lifecycle of one service
//! ```text
//! Pending ──(deps not Ready)──► Blocked ──(deps Ready)──┐
//!    └──────────────────────────────────────────────────┴──► Initializing
//!                                                               │
//!          ┌──────────── Ok ────────────────────────────────────┤
//!          ▼                                                    ▼ Err
//!        Ready                                     Error ──(backoff)──► Initializing
//!                                                    └──(exhausted / fatal)──► Failed
//! ```
//!
//! ## Features
//! | Area               | Description                                                  | Key types / traits                          |
//! |--------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Services**       | Declare services and their dependencies.                     | [`Service`], [`ServiceFn`], [`ServiceSpec`] |
//! | **Orchestration**  | Dependency-ordered bring-up, resets and manual retries.      | [`Orchestrator`], [`BootReport`]            |
//! | **Policies**       | Attempt budget, backoff and jitter.                          | [`RetryPolicy`], [`BackoffPolicy`]          |
//! | **State**          | Reducer-driven store with read-only views.                   | [`Store`], [`StateView`], [`GlobalState`]   |
//! | **Subscriber API** | Hook into lifecycle events (logging, metrics, alerting).     | [`Subscribe`], [`Event`]                    |
//! | **Errors**         | Typed errors for configuration, attempts and entry points.   | [`ConfigError`], [`InitError`], [`BootError`] |
//! | **Configuration**  | Centralize runtime defaults.                                 | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging`: enables the built-in [`LogWriter`] subscriber (on by default).
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bootvisor::{Config, InitError, Orchestrator, RetryPolicy, ServiceSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.retry = RetryPolicy::default().with_max_attempts(5);
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn bootvisor::Subscribe>> = vec![Arc::new(bootvisor::LogWriter::default())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn bootvisor::Subscribe>> = Vec::new();
//!
//!     let orchestrator = Orchestrator::builder(cfg)
//!         .with_subscribers(subs)
//!         .service(ServiceSpec::builder("db").critical().build(|_ctx| async { Ok(()) }))
//!         .service(
//!             ServiceSpec::builder("api")
//!                 .depends_on(["db"])
//!                 .timeout(Duration::from_secs(2))
//!                 .build(|ctx| async move {
//!                     if ctx.is_cancelled() {
//!                         return Err(InitError::Canceled);
//!                     }
//!                     Ok(())
//!                 }),
//!         )
//!         .build();
//!
//!     let view = orchestrator.view();
//!     let report = orchestrator.run().await?;
//!     assert!(view.is_ready());
//!     report.into_result()?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod policies;
mod services;
mod store;
mod subscribers;

// ---- Public re-exports ----

pub use core::{
    Blockers, BootReport, Config, Orchestrator, OrchestratorBuilder, RetryObserver, UpdateGate,
    blockers, blockers_of, can_start, deps_ready, retry_with_backoff,
};
pub use error::{BootError, ConfigError, InitError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use services::{
    Service, ServiceDescriptor, ServiceFn, ServiceRef, ServiceSpec, ServiceSpecBuilder,
    ServiceTable,
};
pub use store::{
    Action, Begin, GlobalState, Outcome, ServiceRecord, ServiceState, StateView, Store, Summary,
    Ticket, reduce,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: a built-in subscriber that renders events through `tracing`.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
