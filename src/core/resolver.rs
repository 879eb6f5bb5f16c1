//! # Dependency resolver.
//!
//! Pure functions over a descriptor and the latest committed [`GlobalState`].
//! Nothing is cached: the orchestrator asks again after every transition, so the
//! resolver and the store cannot disagree.

use crate::services::ServiceDescriptor;
use crate::store::{GlobalState, ServiceState};

/// Dependencies that keep a service from starting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Blockers {
    /// Every dependency that is not `Ready`, in declaration order.
    pub waiting: Vec<String>,
    /// Subset of `waiting` that can no longer become `Ready` without a reset.
    pub failed: Vec<String>,
}

impl Blockers {
    /// Nothing blocks.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    /// Some dependency failed (directly or upstream).
    #[inline]
    pub fn by_failure(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// True iff every dependency of `descriptor` is `Ready` in `state`.
pub fn can_start(descriptor: &ServiceDescriptor, state: &GlobalState) -> bool {
    deps_ready(&descriptor.dependencies, state)
}

/// Same check over a bare dependency list.
pub fn deps_ready(dependencies: &[String], state: &GlobalState) -> bool {
    dependencies
        .iter()
        .all(|dep| state.status(dep) == Some(ServiceState::Ready))
}

/// Diagnoses why `descriptor` cannot start.
pub fn blockers(descriptor: &ServiceDescriptor, state: &GlobalState) -> Blockers {
    blockers_of(&descriptor.dependencies, state)
}

/// Same diagnosis over a bare dependency list.
///
/// An unknown dependency counts as waiting, not failed: late registration may
/// still add it.
pub fn blockers_of(dependencies: &[String], state: &GlobalState) -> Blockers {
    let mut out = Blockers::default();
    for dep in dependencies {
        match state.service(dep) {
            Some(rec) if rec.status == ServiceState::Ready => {}
            Some(rec) => {
                out.waiting.push(dep.clone());
                if rec.is_dead_end() {
                    out.failed.push(dep.clone());
                }
            }
            None => out.waiting.push(dep.clone()),
        }
    }
    out
}
