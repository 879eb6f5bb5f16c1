//! # Reducer: `(state, action) → state'`.
//!
//! | Action           | Precondition                   | Effect                                                     |
//! |------------------|--------------------------------|------------------------------------------------------------|
//! | RegisterService  | id absent                      | new `Pending` record                                       |
//! | ServiceInit      | `Pending`/`Blocked`/`Failed`   | `Initializing`, `started_at`, clears error + blockers      |
//! | ServiceRetry     | `Error`, ticket current        | `Initializing`                                             |
//! | ServiceReady     | `Initializing`, ticket current | `Ready`, `finished_at`, appended to `initialization_order` |
//! | ServiceError     | `Initializing`, ticket current | `retry_count += 1`, error, `Error` or `Failed`             |
//! | ServiceBlocked   | `Pending`/`Blocked`            | `Blocked` with blockers                                    |
//! | ServiceAborted   | in flight, ticket current      | `Pending`                                                  |
//! | ResetService     | known id                       | fresh `Pending` record, removed from the order             |
//! | ResetAll         | –                              | every record fresh `Pending`, order cleared                |
//!
//! After every applied action the derived flags are recomputed from `services`.

use std::time::SystemTime;

use crate::store::action::{Action, Outcome, Ticket};
use crate::store::state::{GlobalState, ServiceRecord, ServiceState};

/// Applies `action` to `state` at wall-clock `now`.
pub fn reduce(state: &mut GlobalState, action: &Action, now: SystemTime) -> Outcome {
    let outcome = apply(state, action, now);
    if outcome.is_applied() {
        state.recompute();
    }
    outcome
}

fn apply(state: &mut GlobalState, action: &Action, now: SystemTime) -> Outcome {
    match action {
        Action::RegisterService { descriptor } => {
            if state.services.contains_key(&descriptor.id) {
                return Outcome::Unchanged;
            }
            state.insert_pending(descriptor);
            Outcome::Applied
        }

        Action::ServiceInit { id } => {
            let Some(rec) = state.services.get_mut(id) else {
                return Outcome::Rejected { status: None };
            };
            match rec.status {
                ServiceState::Pending | ServiceState::Blocked => {}
                ServiceState::Failed => rec.retry_count = 0,
                other => return Outcome::Rejected { status: Some(other) },
            }
            rec.status = ServiceState::Initializing;
            rec.started_at = Some(now);
            rec.finished_at = None;
            rec.error = None;
            rec.blocked_by.clear();
            rec.blocked_by_failure = false;
            Outcome::Applied
        }

        Action::ServiceRetry { ticket, .. } => {
            let rec = match ticketed(state, ticket) {
                Ok(rec) => rec,
                Err(o) => return o,
            };
            if rec.status != ServiceState::Error {
                return Outcome::Rejected {
                    status: Some(rec.status),
                };
            }
            rec.status = ServiceState::Initializing;
            Outcome::Applied
        }

        Action::ServiceReady { ticket } => {
            let rec = match ticketed(state, ticket) {
                Ok(rec) => rec,
                Err(o) => return o,
            };
            if rec.status != ServiceState::Initializing {
                return Outcome::Rejected {
                    status: Some(rec.status),
                };
            }
            rec.status = ServiceState::Ready;
            rec.finished_at = Some(now);
            rec.error = None;
            if !state.initialization_order.contains(&ticket.id) {
                state.initialization_order.push(ticket.id.clone());
            }
            Outcome::Applied
        }

        Action::ServiceError {
            ticket,
            error,
            terminal,
        } => {
            let rec = match ticketed(state, ticket) {
                Ok(rec) => rec,
                Err(o) => return o,
            };
            if rec.status != ServiceState::Initializing {
                return Outcome::Rejected {
                    status: Some(rec.status),
                };
            }
            rec.retry_count = rec.retry_count.saturating_add(1);
            rec.error = Some(error.clone());
            if *terminal {
                rec.status = ServiceState::Failed;
                rec.finished_at = Some(now);
            } else {
                rec.status = ServiceState::Error;
            }
            Outcome::Applied
        }

        Action::ServiceBlocked {
            id,
            blocked_by,
            by_failure,
        } => {
            let Some(rec) = state.services.get_mut(id) else {
                return Outcome::Rejected { status: None };
            };
            match rec.status {
                ServiceState::Blocked
                    if rec.blocked_by == *blocked_by && rec.blocked_by_failure == *by_failure =>
                {
                    Outcome::Unchanged
                }
                ServiceState::Pending | ServiceState::Blocked => {
                    rec.status = ServiceState::Blocked;
                    rec.blocked_by = blocked_by.clone();
                    rec.blocked_by_failure = *by_failure;
                    Outcome::Applied
                }
                other => Outcome::Rejected {
                    status: Some(other),
                },
            }
        }

        Action::ServiceAborted { ticket } => {
            let rec = match ticketed(state, ticket) {
                Ok(rec) => rec,
                Err(o) => return o,
            };
            if !rec.status.is_in_flight() {
                return Outcome::Rejected {
                    status: Some(rec.status),
                };
            }
            rec.status = ServiceState::Pending;
            rec.started_at = None;
            Outcome::Applied
        }

        Action::ResetService { id } => {
            if !state.services.contains_key(id) {
                return Outcome::Rejected { status: None };
            }
            let generation = state.next_generation();
            if let Some(rec) = state.services.get_mut(id) {
                *rec = rec.renewed(generation);
            }
            state.initialization_order.retain(|done| done != id);
            Outcome::Applied
        }

        Action::ResetAll => {
            let mut ids: Vec<String> = state.services.keys().cloned().collect();
            ids.sort_unstable();
            for id in ids {
                let generation = state.next_generation();
                if let Some(rec) = state.services.get_mut(&id) {
                    *rec = rec.renewed(generation);
                }
            }
            state.initialization_order.clear();
            Outcome::Applied
        }
    }
}

fn ticketed<'a>(
    state: &'a mut GlobalState,
    ticket: &Ticket,
) -> Result<&'a mut ServiceRecord, Outcome> {
    match state.services.get_mut(&ticket.id) {
        Some(rec) if rec.generation == ticket.generation => Ok(rec),
        _ => Err(Outcome::Stale),
    }
}
