//! # Store data model.
//!
//! [`GlobalState`] is owned by the [`Store`](crate::Store); everything else only
//! sees clones or borrowed views of it.

use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

use crate::error::InitError;
use crate::services::ServiceDescriptor;

/// Lifecycle state of one service.
///
/// ```text
/// Pending ──► Initializing ──► Ready
///   │  ▲           │  ▲
///   ▼  │           ▼  │ (retry)
/// Blocked         Error ──(exhausted)──► Failed
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceState {
    /// Registered, not yet attempted.
    Pending,
    /// Waiting on dependencies (diagnostic, re-evaluated every sweep).
    Blocked,
    /// An attempt is running.
    Initializing,
    /// Initialized.
    Ready,
    /// An attempt failed; the retry loop will try again.
    Error,
    /// Attempts exhausted (or fatal error).
    Failed,
}

impl ServiceState {
    /// `Ready` or `Failed`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, ServiceState::Ready | ServiceState::Failed)
    }

    /// `Initializing` or `Error`: owned by a running retry loop.
    #[inline]
    pub fn is_in_flight(self) -> bool {
        matches!(self, ServiceState::Initializing | ServiceState::Error)
    }

    /// Short stable label.
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceState::Pending => "pending",
            ServiceState::Blocked => "blocked",
            ServiceState::Initializing => "initializing",
            ServiceState::Ready => "ready",
            ServiceState::Error => "error",
            ServiceState::Failed => "failed",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable per-service record.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceRecord {
    pub id: String,
    pub status: ServiceState,
    /// Last recorded error (cleared when a new run starts).
    pub error: Option<InitError>,
    pub started_at: Option<SystemTime>,
    pub finished_at: Option<SystemTime>,
    /// Failed attempts in the current run.
    pub retry_count: u32,
    pub dependencies: Vec<String>,
    pub critical_path: bool,
    /// Dependencies that were not `Ready` at the last evaluation.
    pub blocked_by: Vec<String>,
    /// Some dependency in `blocked_by` failed (directly or upstream).
    pub blocked_by_failure: bool,
    /// Identity of this incarnation of the record; changes on reset.
    pub generation: u64,
}

impl ServiceRecord {
    pub(crate) fn pending(descriptor: &ServiceDescriptor, generation: u64) -> Self {
        Self {
            id: descriptor.id.clone(),
            status: ServiceState::Pending,
            error: None,
            started_at: None,
            finished_at: None,
            retry_count: 0,
            dependencies: descriptor.dependencies.clone(),
            critical_path: descriptor.critical_path,
            blocked_by: Vec::new(),
            blocked_by_failure: false,
            generation,
        }
    }

    /// Re-creates this record as `Pending` with a new generation.
    pub(crate) fn renewed(&self, generation: u64) -> Self {
        Self {
            id: self.id.clone(),
            status: ServiceState::Pending,
            error: None,
            started_at: None,
            finished_at: None,
            retry_count: 0,
            dependencies: self.dependencies.clone(),
            critical_path: self.critical_path,
            blocked_by: Vec::new(),
            blocked_by_failure: false,
            generation,
        }
    }

    /// True when this record can never become `Ready` without a reset somewhere upstream.
    #[inline]
    pub fn is_dead_end(&self) -> bool {
        self.status == ServiceState::Failed
            || (self.status == ServiceState::Blocked && self.blocked_by_failure)
    }
}

/// Authoritative orchestration state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlobalState {
    pub services: HashMap<String, ServiceRecord>,
    /// Ids in the order they actually reached `Ready`.
    pub initialization_order: Vec<String>,
    pub dependencies: HashMap<String, Vec<String>>,
    /// Every record is `Ready`.
    pub ready: bool,
    /// Some critical-path record is `Failed`.
    pub has_critical_failure: bool,
    /// Error of the first critical failure.
    pub error: Option<InitError>,
    /// Last generation handed out; survives `ResetAll`.
    pub(crate) generation_seq: u64,
}

impl GlobalState {
    /// Initial state with one `Pending` record per descriptor.
    pub fn from_descriptors<'a, I>(descriptors: I) -> Self
    where
        I: IntoIterator<Item = &'a ServiceDescriptor>,
    {
        let mut state = GlobalState::default();
        for d in descriptors {
            state.insert_pending(d);
        }
        state.recompute();
        state
    }

    /// Record for `id`.
    pub fn service(&self, id: &str) -> Option<&ServiceRecord> {
        self.services.get(id)
    }

    /// Status of `id`.
    pub fn status(&self, id: &str) -> Option<ServiceState> {
        self.services.get(id).map(|r| r.status)
    }

    /// Count of records in `status`.
    pub fn count(&self, status: ServiceState) -> usize {
        self.services.values().filter(|r| r.status == status).count()
    }

    pub(crate) fn next_generation(&mut self) -> u64 {
        self.generation_seq += 1;
        self.generation_seq
    }

    pub(crate) fn insert_pending(&mut self, d: &ServiceDescriptor) {
        let generation = self.next_generation();
        self.dependencies
            .insert(d.id.clone(), d.dependencies.clone());
        self.services
            .insert(d.id.clone(), ServiceRecord::pending(d, generation));
    }

    /// Critical-path record that reached `Failed` first.
    pub fn first_critical_failure(&self) -> Option<&ServiceRecord> {
        self.services
            .values()
            .filter(|r| r.critical_path && r.status == ServiceState::Failed)
            .min_by(|a, b| {
                a.finished_at
                    .cmp(&b.finished_at)
                    .then_with(|| a.id.cmp(&b.id))
            })
    }

    /// Nothing is left to converge: a critical failure is recorded, or every
    /// record is `Ready` or a [dead end](ServiceRecord::is_dead_end).
    pub fn is_settled(&self) -> bool {
        self.has_critical_failure
            || self
                .services
                .values()
                .all(|r| r.status == ServiceState::Ready || r.is_dead_end())
    }

    /// Re-derives `ready`, `has_critical_failure` and `error` from `services`.
    pub(crate) fn recompute(&mut self) {
        self.ready = self
            .services
            .values()
            .all(|r| r.status == ServiceState::Ready);

        let (failed, error) = match self.first_critical_failure() {
            Some(rec) => (true, rec.error.clone()),
            None => (false, None),
        };
        self.has_critical_failure = failed;
        self.error = error;
    }
}
