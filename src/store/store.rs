//! # Single-writer state store.
//!
//! [`Store`] owns the [`GlobalState`] inside a `tokio::sync::watch` channel.
//! Every mutation goes through [`Store::dispatch`], which runs the reducer under
//! the channel's write lock, then:
//! - notifies [`StateView`] receivers (only if something changed),
//! - publishes one transition [`Event`] on the [`Bus`] (plus `SystemReady` /
//!   `CriticalFailure` when the aggregate flags flip).
//!
//! ```text
//! dispatch(action) ──► [watch write lock] reduce ──► recompute flags
//!                                              ├─► Bus::publish(transition event)
//!                                              └─► watch receivers woken
//! ```

use std::time::SystemTime;

use tokio::sync::watch;

use crate::core::resolver::{self, Blockers};
use crate::events::{Bus, Event, EventKind};
use crate::services::ServiceDescriptor;
use crate::store::action::{Action, Outcome, Ticket};
use crate::store::reducer::reduce;
use crate::store::state::{GlobalState, ServiceState};
use crate::store::view::StateView;

/// Result of [`Store::begin`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Begin {
    /// `ServiceInit` committed; report the outcome with this ticket.
    Started(Ticket),
    /// Dependencies not `Ready`; the record is `Blocked`.
    Blocked(Blockers),
    /// Nothing to do; the record is already in this state.
    Skipped(ServiceState),
    /// No such record.
    Unknown,
}

/// Reducer-driven store with change notification.
pub struct Store {
    tx: watch::Sender<GlobalState>,
    bus: Bus,
}

impl Store {
    /// Creates a store with an injected initial state.
    pub fn new(initial: GlobalState, bus: Bus) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx, bus }
    }

    /// Applies one action.
    pub fn dispatch(&self, action: Action) -> Outcome {
        let mut outcome = Outcome::Unchanged;
        self.tx.send_if_modified(|state| {
            outcome = self.commit(state, &action);
            outcome.is_applied()
        });
        outcome
    }

    /// Atomically re-checks dependencies of `descriptor` and either commits
    /// `ServiceInit` or marks the record `Blocked`.
    ///
    /// Only `Pending` and `Blocked` records are started; anything else is
    /// reported as [`Begin::Skipped`]. Restarting a `Failed` record needs a reset.
    pub fn begin(&self, descriptor: &ServiceDescriptor) -> Begin {
        let mut result = Begin::Unknown;
        self.tx.send_if_modified(|state| {
            let Some(status) = state.status(&descriptor.id) else {
                return false;
            };
            if !matches!(status, ServiceState::Pending | ServiceState::Blocked) {
                result = Begin::Skipped(status);
                return false;
            }

            let blockers = resolver::blockers(descriptor, state);
            if !blockers.is_empty() {
                let action = Action::ServiceBlocked {
                    id: descriptor.id.clone(),
                    blocked_by: blockers.waiting.clone(),
                    by_failure: blockers.by_failure(),
                };
                result = Begin::Blocked(blockers);
                return self.commit(state, &action).is_applied();
            }

            let action = Action::ServiceInit {
                id: descriptor.id.clone(),
            };
            let applied = self.commit(state, &action).is_applied();
            if let Some(rec) = state.service(&descriptor.id).filter(|_| applied) {
                result = Begin::Started(Ticket {
                    id: rec.id.clone(),
                    generation: rec.generation,
                });
            }
            applied
        });
        result
    }

    /// Clone of the current state.
    pub fn state(&self) -> GlobalState {
        self.tx.borrow().clone()
    }

    /// Runs `f` against the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&GlobalState) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Read-only subscription for consumers.
    pub fn view(&self) -> StateView {
        StateView::new(self.tx.subscribe())
    }

    /// Event bus the store publishes transitions on.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    fn commit(&self, state: &mut GlobalState, action: &Action) -> Outcome {
        let was_ready = state.ready;
        let had_critical = state.has_critical_failure;

        let outcome = reduce(state, action, SystemTime::now());
        match outcome {
            Outcome::Applied => {
                self.publish_transition(state, action);
                if state.ready && !was_ready && !state.services.is_empty() {
                    self.bus.publish(Event::new(EventKind::SystemReady));
                }
                if state.has_critical_failure && !had_critical {
                    self.publish_critical(state, action);
                }
            }
            Outcome::Stale => {
                let mut ev = Event::new(EventKind::StaleUpdateIgnored).with_reason(action.name());
                if let Some(id) = action.service_id() {
                    ev = ev.with_service(id);
                }
                self.bus.publish(ev);
            }
            Outcome::Unchanged | Outcome::Rejected { .. } => {}
        }
        outcome
    }

    fn publish_transition(&self, state: &GlobalState, action: &Action) {
        let ev = match action {
            Action::RegisterService { descriptor } => {
                Event::new(EventKind::ServiceRegistered).with_service(descriptor.id.as_str())
            }
            Action::ServiceInit { id } => Event::new(EventKind::ServiceInitializing)
                .with_service(id.as_str())
                .with_attempt(1),
            Action::ServiceRetry { ticket, attempt } => Event::new(EventKind::ServiceInitializing)
                .with_service(ticket.id.as_str())
                .with_attempt(*attempt),
            Action::ServiceReady { ticket } => {
                Event::new(EventKind::ServiceReady).with_service(ticket.id.as_str())
            }
            Action::ServiceError {
                ticket,
                error,
                terminal,
            } => {
                let kind = if *terminal {
                    EventKind::ServiceFailed
                } else {
                    EventKind::ServiceErrored
                };
                let rec = state.service(&ticket.id);
                Event::new(kind)
                    .with_service(ticket.id.as_str())
                    .with_attempt(rec.map_or(0, |r| r.retry_count))
                    .with_critical(rec.is_some_and(|r| r.critical_path))
                    .with_reason(error.to_string())
            }
            Action::ServiceBlocked {
                id,
                blocked_by,
                by_failure,
            } => Event::new(EventKind::ServiceBlocked)
                .with_service(id.as_str())
                .with_reason(blocked_by.join(","))
                .with_blocked_by_failure(*by_failure),
            Action::ServiceAborted { ticket } => {
                Event::new(EventKind::ServiceAborted).with_service(ticket.id.as_str())
            }
            Action::ResetService { id } => {
                Event::new(EventKind::ServiceReset).with_service(id.as_str())
            }
            Action::ResetAll => Event::new(EventKind::StoreReset),
        };
        self.bus.publish(ev);
    }

    fn publish_critical(&self, state: &GlobalState, action: &Action) {
        let mut ev = Event::new(EventKind::CriticalFailure).with_critical(true);
        if let Some(id) = action.service_id() {
            ev = ev.with_service(id);
        }
        if let Some(err) = &state.error {
            ev = ev.with_reason(err.to_string());
        }
        self.bus.publish(ev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InitError;

    fn store() -> (Store, tokio::sync::broadcast::Receiver<Event>) {
        let bus = Bus::new(64);
        let rx = bus.subscribe();
        let state = GlobalState::from_descriptors(&[
            ServiceDescriptor::new("a").critical(true),
            ServiceDescriptor::new("b").depends_on(["a"]),
        ]);
        (Store::new(state, bus), rx)
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev.kind);
        }
        out
    }

    #[test]
    fn begin_blocks_until_dependencies_are_ready() {
        let (store, mut rx) = store();
        let b = ServiceDescriptor::new("b").depends_on(["a"]);

        let Begin::Blocked(blockers) = store.begin(&b) else {
            panic!("b must be blocked while a is pending");
        };
        assert_eq!(blockers.waiting, vec!["a"]);
        assert!(!blockers.by_failure());
        assert_eq!(store.read(|s| s.status("b")), Some(ServiceState::Blocked));

        let Begin::Started(ticket) = store.begin(&ServiceDescriptor::new("a")) else {
            panic!("a has no dependencies");
        };
        assert_eq!(store.dispatch(Action::ServiceReady { ticket }), Outcome::Applied);
        assert!(matches!(store.begin(&b), Begin::Started(_)));

        assert_eq!(
            drain(&mut rx),
            vec![
                EventKind::ServiceBlocked,
                EventKind::ServiceInitializing,
                EventKind::ServiceReady,
                EventKind::ServiceInitializing,
            ]
        );
    }

    #[test]
    fn begin_skips_in_flight_and_terminal_records() {
        let (store, _rx) = store();
        let a = ServiceDescriptor::new("a");
        assert!(matches!(store.begin(&a), Begin::Started(_)));
        assert_eq!(store.begin(&a), Begin::Skipped(ServiceState::Initializing));
        assert_eq!(store.begin(&ServiceDescriptor::new("ghost")), Begin::Unknown);
    }

    #[test]
    fn critical_failure_and_system_ready_events() {
        let (store, mut rx) = store();
        let Begin::Started(a) = store.begin(&ServiceDescriptor::new("a")) else {
            panic!("a must start");
        };
        store.dispatch(Action::ServiceError {
            ticket: a,
            error: InitError::fatal("disk gone"),
            terminal: true,
        });
        assert_eq!(
            drain(&mut rx),
            vec![
                EventKind::ServiceInitializing,
                EventKind::ServiceFailed,
                EventKind::CriticalFailure,
            ]
        );

        store.dispatch(Action::ResetAll);
        for id in ["a", "b"] {
            let Begin::Started(t) = store.begin(&ServiceDescriptor::new(id).depends_on(
                if id == "b" { vec!["a"] } else { vec![] },
            )) else {
                panic!("{id} must start");
            };
            store.dispatch(Action::ServiceReady { ticket: t });
        }
        let kinds = drain(&mut rx);
        assert_eq!(kinds.first(), Some(&EventKind::StoreReset));
        assert_eq!(kinds.last(), Some(&EventKind::SystemReady));
        assert!(store.read(|s| s.ready));
    }

    #[tokio::test]
    async fn unchanged_dispatch_does_not_wake_views() {
        let (store, _rx) = store();
        let mut view = store.view();
        let action = Action::ServiceBlocked {
            id: "b".into(),
            blocked_by: vec!["a".into()],
            by_failure: false,
        };
        store.dispatch(action.clone());
        assert!(view.has_changed());
        view.mark_seen();

        assert_eq!(store.dispatch(action), Outcome::Unchanged);
        assert!(!view.has_changed());
    }

    #[test]
    fn stale_ticket_publishes_diagnostic() {
        let (store, mut rx) = store();
        let Begin::Started(a) = store.begin(&ServiceDescriptor::new("a")) else {
            panic!("a must start");
        };
        store.dispatch(Action::ResetService { id: "a".into() });
        assert_eq!(store.dispatch(Action::ServiceReady { ticket: a }), Outcome::Stale);
        assert_eq!(drain(&mut rx).last(), Some(&EventKind::StaleUpdateIgnored));
        assert_eq!(store.read(|s| s.status("a")), Some(ServiceState::Pending));
    }
}
