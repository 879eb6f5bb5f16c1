use std::collections::HashSet;
use std::time::SystemTime;

use bootvisor::{
    Action, GlobalState, InitError, Outcome, ServiceDescriptor, ServiceState, Ticket, reduce,
};
use proptest::prelude::*;

const IDS: [&str; 6] = ["db", "cache", "api", "web", "late-a", "late-b"];

#[derive(Clone, Debug)]
enum Op {
    Register(usize),
    Init(usize),
    Retry(usize, bool),
    Ready(usize, bool),
    Error(usize, bool, bool),
    Blocked(usize, bool),
    Aborted(usize, bool),
    Reset(usize),
    ResetAll,
}

fn op() -> impl Strategy<Value = Op> {
    let idx = 0..IDS.len();
    prop_oneof![
        1 => idx.clone().prop_map(Op::Register),
        3 => idx.clone().prop_map(Op::Init),
        1 => (idx.clone(), any::<bool>()).prop_map(|(i, fresh)| Op::Retry(i, fresh)),
        3 => (idx.clone(), any::<bool>()).prop_map(|(i, fresh)| Op::Ready(i, fresh)),
        2 => (idx.clone(), any::<bool>(), any::<bool>())
            .prop_map(|(i, fresh, terminal)| Op::Error(i, fresh, terminal)),
        1 => (idx.clone(), any::<bool>()).prop_map(|(i, by_failure)| Op::Blocked(i, by_failure)),
        1 => (idx.clone(), any::<bool>()).prop_map(|(i, fresh)| Op::Aborted(i, fresh)),
        1 => idx.prop_map(Op::Reset),
        1 => Just(Op::ResetAll),
    ]
}

fn initial() -> GlobalState {
    GlobalState::from_descriptors(&[
        ServiceDescriptor::new("db").critical(true),
        ServiceDescriptor::new("cache"),
        ServiceDescriptor::new("api").depends_on(["db", "cache"]).critical(true),
        ServiceDescriptor::new("web").depends_on(["api"]),
    ])
}

/// Ticket for the record's current incarnation, or one from an older/unknown one.
fn ticket(state: &GlobalState, i: usize, fresh: bool) -> Ticket {
    let id = IDS[i];
    let current = state.service(id).map_or(0, |r| r.generation);
    Ticket {
        id: id.to_string(),
        generation: if fresh { current } else { current + 10_000 },
    }
}

fn to_action(state: &GlobalState, op: &Op) -> Action {
    match *op {
        Op::Register(i) => Action::RegisterService {
            descriptor: ServiceDescriptor::new(IDS[i]),
        },
        Op::Init(i) => Action::ServiceInit { id: IDS[i].into() },
        Op::Retry(i, fresh) => Action::ServiceRetry {
            ticket: ticket(state, i, fresh),
            attempt: 2,
        },
        Op::Ready(i, fresh) => Action::ServiceReady {
            ticket: ticket(state, i, fresh),
        },
        Op::Error(i, fresh, terminal) => Action::ServiceError {
            ticket: ticket(state, i, fresh),
            error: InitError::application("boom"),
            terminal,
        },
        Op::Blocked(i, by_failure) => Action::ServiceBlocked {
            id: IDS[i].into(),
            blocked_by: vec!["db".into()],
            by_failure,
        },
        Op::Aborted(i, fresh) => Action::ServiceAborted {
            ticket: ticket(state, i, fresh),
        },
        Op::Reset(i) => Action::ResetService { id: IDS[i].into() },
        Op::ResetAll => Action::ResetAll,
    }
}

fn check_invariants(state: &GlobalState) -> Result<(), TestCaseError> {
    let all_ready = state
        .services
        .values()
        .all(|r| r.status == ServiceState::Ready);
    prop_assert_eq!(state.ready, all_ready);

    let critical_failed = state
        .services
        .values()
        .any(|r| r.critical_path && r.status == ServiceState::Failed);
    prop_assert_eq!(state.has_critical_failure, critical_failed);
    prop_assert_eq!(state.error.is_some(), critical_failed);

    let ready_ids: HashSet<&str> = state
        .services
        .values()
        .filter(|r| r.status == ServiceState::Ready)
        .map(|r| r.id.as_str())
        .collect();
    let ordered: HashSet<&str> = state.initialization_order.iter().map(String::as_str).collect();
    prop_assert_eq!(ordered.len(), state.initialization_order.len(), "duplicate in order");
    prop_assert_eq!(ready_ids, ordered);

    for rec in state.services.values() {
        if rec.status == ServiceState::Failed {
            prop_assert!(rec.error.is_some());
        }
        if rec.status != ServiceState::Blocked {
            prop_assert!(rec.blocked_by.is_empty());
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn derived_flags_follow_every_action(ops in prop::collection::vec(op(), 1..80)) {
        let mut state = initial();
        check_invariants(&state)?;

        for op in &ops {
            let action = to_action(&state, op);
            let before = state.clone();
            let outcome = reduce(&mut state, &action, SystemTime::now());

            if !outcome.is_applied() {
                prop_assert_eq!(&state, &before, "{:?} -> {:?} must not mutate", action, outcome);
            }
            if outcome == Outcome::Stale {
                let ticketed = match *op {
                    Op::Retry(i, fresh) | Op::Ready(i, fresh) | Op::Aborted(i, fresh) | Op::Error(i, fresh, _) => {
                        Some((i, fresh))
                    }
                    _ => None,
                };
                // Only an old ticket, or one for an unregistered id, is stale.
                prop_assert!(ticketed.is_some_and(|(i, fresh)| !fresh || before.service(IDS[i]).is_none()));
            }
            check_invariants(&state)?;
        }
    }

    #[test]
    fn generations_only_move_forward(ops in prop::collection::vec(op(), 1..60)) {
        let mut state = initial();
        for op in &ops {
            let before: Vec<(String, u64)> = state
                .services
                .values()
                .map(|r| (r.id.clone(), r.generation))
                .collect();
            let action = to_action(&state, op);
            reduce(&mut state, &action, SystemTime::now());
            for (id, generation) in before {
                prop_assert!(state.services[&id].generation >= generation);
            }
        }
    }
}
