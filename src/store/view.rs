//! # Read-only view of the store.
//!
//! [`StateView`] is what consumers hold: queries against the latest committed
//! state plus change notification. It cannot dispatch.

use tokio::sync::watch;

use crate::error::InitError;
use crate::store::state::{GlobalState, ServiceState};

/// Per-status record counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub pending: usize,
    pub blocked: usize,
    pub initializing: usize,
    pub ready: usize,
    pub error: usize,
    pub failed: usize,
}

impl Summary {
    fn of(state: &GlobalState) -> Self {
        let mut s = Summary {
            total: state.services.len(),
            ..Summary::default()
        };
        for rec in state.services.values() {
            match rec.status {
                ServiceState::Pending => s.pending += 1,
                ServiceState::Blocked => s.blocked += 1,
                ServiceState::Initializing => s.initializing += 1,
                ServiceState::Ready => s.ready += 1,
                ServiceState::Error => s.error += 1,
                ServiceState::Failed => s.failed += 1,
            }
        }
        s
    }
}

/// Subscription to [`GlobalState`] changes.
#[derive(Clone, Debug)]
pub struct StateView {
    rx: watch::Receiver<GlobalState>,
}

impl StateView {
    pub(crate) fn new(rx: watch::Receiver<GlobalState>) -> Self {
        Self { rx }
    }

    /// Every registered service is `Ready`.
    pub fn is_ready(&self) -> bool {
        self.rx.borrow().ready
    }

    pub fn is_service_ready(&self, id: &str) -> bool {
        self.status(id) == Some(ServiceState::Ready)
    }

    /// Last recorded error of `id`.
    pub fn service_error(&self, id: &str) -> Option<InitError> {
        self.rx.borrow().service(id).and_then(|r| r.error.clone())
    }

    pub fn status(&self, id: &str) -> Option<ServiceState> {
        self.rx.borrow().status(id)
    }

    pub fn has_critical_failure(&self) -> bool {
        self.rx.borrow().has_critical_failure
    }

    /// Error of the first critical failure.
    pub fn error(&self) -> Option<InitError> {
        self.rx.borrow().error.clone()
    }

    /// Ids in the order they became `Ready`.
    pub fn initialization_order(&self) -> Vec<String> {
        self.rx.borrow().initialization_order.clone()
    }

    pub fn summary(&self) -> Summary {
        Summary::of(&self.rx.borrow())
    }

    /// Clone of the latest state; marks it as seen.
    pub fn snapshot(&mut self) -> GlobalState {
        self.rx.borrow_and_update().clone()
    }

    /// True if a transition was committed since the last [`snapshot`](Self::snapshot),
    /// [`changed`](Self::changed) or [`mark_seen`](Self::mark_seen).
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    pub fn mark_seen(&mut self) {
        self.rx.mark_unchanged();
    }

    /// Waits for the next committed transition.
    ///
    /// Returns `false` once the store is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Waits until `pred` holds for the latest state and returns a clone of it.
    ///
    /// Returns `None` if the store is dropped first.
    pub async fn wait_for<F>(&mut self, mut pred: F) -> Option<GlobalState>
    where
        F: FnMut(&GlobalState) -> bool,
    {
        self.rx.wait_for(|s| pred(s)).await.ok().map(|s| s.clone())
    }

    /// Waits until the system is ready, degraded (every un-`Ready` record is a
    /// dead end) or critically failed. See [`GlobalState::is_settled`].
    pub async fn wait_until_settled(&mut self) -> Option<GlobalState> {
        self.wait_for(GlobalState::is_settled).await
    }
}
