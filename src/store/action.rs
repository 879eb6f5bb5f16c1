//! # Store actions.
//!
//! Every mutation of [`GlobalState`](crate::GlobalState) is one of these.
//! Actions that report the result of an initialization carry a [`Ticket`]; a
//! ticket whose generation no longer matches the record (the record was reset
//! meanwhile) makes the action a no-op.

use crate::error::InitError;
use crate::services::ServiceDescriptor;
use crate::store::state::ServiceState;

/// Proof that a particular incarnation of a record was started.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub id: String,
    pub generation: u64,
}

/// Typed store mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Adds a `Pending` record (late registration).
    RegisterService { descriptor: ServiceDescriptor },
    /// `Pending | Blocked | Failed` → `Initializing`.
    ServiceInit { id: String },
    /// `Error` → `Initializing` for the next attempt of the same run.
    ServiceRetry { ticket: Ticket, attempt: u32 },
    /// `Initializing` → `Ready`.
    ServiceReady { ticket: Ticket },
    /// `Initializing` → `Error` (or `Failed` when `terminal`).
    ServiceError {
        ticket: Ticket,
        error: InitError,
        terminal: bool,
    },
    /// `Pending | Blocked` → `Blocked`.
    ServiceBlocked {
        id: String,
        blocked_by: Vec<String>,
        by_failure: bool,
    },
    /// `Initializing | Error` → `Pending` (runtime shut down mid-flight).
    ServiceAborted { ticket: Ticket },
    /// Re-creates one record as `Pending`.
    ResetService { id: String },
    /// Re-creates every record as `Pending`.
    ResetAll,
}

impl Action {
    /// Short stable name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::RegisterService { .. } => "register_service",
            Action::ServiceInit { .. } => "service_init",
            Action::ServiceRetry { .. } => "service_retry",
            Action::ServiceReady { .. } => "service_ready",
            Action::ServiceError { .. } => "service_error",
            Action::ServiceBlocked { .. } => "service_blocked",
            Action::ServiceAborted { .. } => "service_aborted",
            Action::ResetService { .. } => "reset_service",
            Action::ResetAll => "reset_all",
        }
    }

    /// Service the action targets (`None` for `ResetAll`).
    pub fn service_id(&self) -> Option<&str> {
        match self {
            Action::RegisterService { descriptor } => Some(&descriptor.id),
            Action::ServiceInit { id }
            | Action::ServiceBlocked { id, .. }
            | Action::ResetService { id } => Some(id),
            Action::ServiceRetry { ticket, .. }
            | Action::ServiceReady { ticket }
            | Action::ServiceError { ticket, .. }
            | Action::ServiceAborted { ticket } => Some(&ticket.id),
            Action::ResetAll => None,
        }
    }
}

/// Result of reducing one action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// State changed.
    Applied,
    /// Valid action that would not change anything.
    Unchanged,
    /// Precondition failed; carries the record's status (`None` = unknown id).
    Rejected { status: Option<ServiceState> },
    /// Ticket generation does not match the record.
    Stale,
}

impl Outcome {
    #[inline]
    pub fn is_applied(self) -> bool {
        matches!(self, Outcome::Applied)
    }
}
