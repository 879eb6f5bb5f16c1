//! Runtime core: dependency resolution, retries and the driver loop.
//!
//! The public entry point is [`Orchestrator`], built with [`OrchestratorBuilder`].
//!
//! Internal modules:
//! - [`resolver`]: pure "can this service start?" checks against the store;
//! - [`runner`]: executes one attempt with timeout and child cancellation;
//! - [`retry`]: bounded retry loop with backoff and an observer side channel;
//! - [`gate`]: per-key serialization of initializations;
//! - [`orchestrator`]: sweeps the table, starts eligible services, converges.

mod builder;
mod config;
mod gate;
mod orchestrator;
pub(crate) mod resolver;
mod retry;
mod runner;

pub use builder::OrchestratorBuilder;
pub use config::Config;
pub use gate::UpdateGate;
pub use orchestrator::{BootReport, Orchestrator};
pub use resolver::{Blockers, blockers, blockers_of, can_start, deps_ready};
pub use retry::{RetryObserver, retry_with_backoff};
