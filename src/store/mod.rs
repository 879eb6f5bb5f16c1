//! State store.
//!
//! - [`state`]: [`GlobalState`], [`ServiceRecord`], [`ServiceState`];
//! - [`action`]: typed mutations and their [`Outcome`];
//! - [`reducer`]: the pure transition function;
//! - [`store`]: single writer with change notification;
//! - [`view`]: read-only handle for consumers.

mod action;
mod reducer;
mod state;
#[allow(clippy::module_inception)]
mod store;
mod view;

pub use action::{Action, Outcome, Ticket};
pub use reducer::reduce;
pub use state::{GlobalState, ServiceRecord, ServiceState};
pub use store::{Begin, Store};
pub use view::{StateView, Summary};
