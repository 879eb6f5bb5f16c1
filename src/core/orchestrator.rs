//! # Orchestrator: dependency-ordered bootstrap of a service table.
//!
//! The [`Orchestrator`] owns the [`ServiceTable`], the [`Store`], the event [`Bus`]
//! and the [`UpdateGate`]. [`run`](Orchestrator::run) sweeps the table and starts
//! every service whose dependencies are `Ready`, then sweeps again whenever the
//! store commits a transition or an initialization finishes.
//!
//! ## Driver loop
//! ```text
//! run()
//!   ├─► table.validate()                  (ConfigError → BootError::Configuration)
//!   ├─► dispatch RegisterService × N
//!   └─► loop {
//!         state = view.snapshot()
//!         for spec in table (declaration order):
//!           ├─ Ready / Failed / Initializing / Error / in flight → skip
//!           ├─ blockers(spec, state) non-empty → dispatch ServiceBlocked
//!           └─ else spawn: gate.run(id, init_once(spec))
//!         nothing started and nothing in flight (here or in a
//!         concurrent initialize_service)  → break
//!         select! { shutdown | store changed | init finished }
//!       }
//! ```
//!
//! ## One initialization
//! ```text
//! gate.run(id) ─► store.begin(descriptor)      (atomic dependency re-check + ServiceInit)
//!                   └─ Started(ticket)
//!                        └─► retry_with_backoff(id, policy, reporter, token, service.initialize)
//!                              ├─ attempt n > 1   → ServiceRetry
//!                              ├─ retryable error → ServiceError { terminal: false }, BackoffScheduled
//!                              ├─ Ok              → ServiceReady
//!                              ├─ shutdown        → ServiceAborted
//!                              └─ exhausted/fatal → ServiceError { terminal: true }
//! ```
//!
//! ## Rules
//! - A `Failed` service, or one blocked by a failed upstream, is never started
//!   again without [`reset_service`](Orchestrator::reset_service) /
//!   [`reset_all`](Orchestrator::reset_all) / [`retry_service`](Orchestrator::retry_service).
//! - Resets do not cancel in-flight attempts; their late results carry an old
//!   ticket and are ignored by the store.
//! - [`shutdown`](Orchestrator::shutdown) cancels every attempt and backoff sleep;
//!   interrupted records return to `Pending`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use bootvisor::{Config, Orchestrator, ServiceSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = Orchestrator::builder(Config::default())
//!         .service(ServiceSpec::builder("db").critical().build(|_ctx| async { Ok(()) }))
//!         .service(
//!             ServiceSpec::builder("api")
//!                 .depends_on(["db"])
//!                 .timeout(Duration::from_secs(5))
//!                 .build(|_ctx| async { Ok(()) }),
//!         )
//!         .build();
//!
//!     let state = orchestrator.run().await?.into_result()?;
//!     assert!(state.ready);
//!     assert_eq!(state.initialization_order, vec!["db", "api"]);
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{RwLock, broadcast};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::core::{
    builder::OrchestratorBuilder, config::Config, gate::UpdateGate, resolver,
    retry::{RetryObserver, retry_with_backoff},
};
use crate::error::{BootError, InitError};
use crate::events::{Bus, Event, EventKind};
use crate::services::{ServiceSpec, ServiceTable};
use crate::store::{Action, Begin, GlobalState, Outcome, ServiceState, StateView, Store, Ticket};
use crate::subscribers::{SubscriberSet, panic_message};

/// Result of one [`Orchestrator::run`].
#[derive(Clone, Debug)]
pub struct BootReport {
    /// Sweeps that started at least one initialization.
    pub sweeps: usize,
    /// State after the driver converged.
    pub state: GlobalState,
}

impl BootReport {
    /// Every service is `Ready`.
    pub fn is_ready(&self) -> bool {
        self.state.ready
    }

    /// Ids in `status`, sorted.
    pub fn ids_in(&self, status: ServiceState) -> Vec<String> {
        let mut ids: Vec<String> = self
            .state
            .services
            .values()
            .filter(|r| r.status == status)
            .map(|r| r.id.clone())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Turns a critical failure into [`BootError::CriticalFailure`].
    ///
    /// Non-critical failures do not make this an error; inspect
    /// [`is_ready`](Self::is_ready) or the state for them.
    pub fn into_result(self) -> Result<GlobalState, BootError> {
        if let Some(rec) = self.state.first_critical_failure() {
            return Err(BootError::CriticalFailure {
                id: rec.id.clone(),
                source: rec
                    .error
                    .clone()
                    .unwrap_or_else(|| InitError::application("failed")),
            });
        }
        Ok(self.state)
    }
}

/// Drives service initialization in dependency order.
pub struct Orchestrator {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    store: Store,
    table: RwLock<ServiceTable>,
    gate: UpdateGate<String>,
    runtime_token: CancellationToken,
}

impl Orchestrator {
    /// Starts building an orchestrator.
    pub fn builder(cfg: Config) -> OrchestratorBuilder {
        OrchestratorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        table: ServiceTable,
        runtime_token: CancellationToken,
    ) -> Self {
        let store = Store::new(GlobalState::from_descriptors(std::iter::empty()), bus.clone());
        let orchestrator = Self {
            cfg,
            bus,
            subs,
            store,
            table: RwLock::new(table),
            gate: UpdateGate::new(),
            runtime_token,
        };
        orchestrator.subscriber_listener();
        orchestrator
    }

    /// Validates the table, then initializes every service it can.
    ///
    /// Returns once nothing is in flight and nothing more can start. Services
    /// that remain un-`Ready` are `Failed` or blocked by a failed upstream.
    pub async fn run(self: &Arc<Self>) -> Result<BootReport, BootError> {
        let descriptors = {
            let table = self.table.read().await;
            table.validate()?;
            table.descriptors().cloned().collect::<Vec<_>>()
        };
        for descriptor in descriptors {
            self.store.dispatch(Action::RegisterService { descriptor });
        }

        let sweeps = self.drive().await;
        if self.runtime_token.is_cancelled() {
            return Err(BootError::Canceled);
        }
        Ok(BootReport {
            sweeps,
            state: self.store.state(),
        })
    }

    /// Registers `spec` (if its id is new) and brings it up together with any
    /// dependency that is not `Ready` yet.
    ///
    /// If the id is already registered the existing spec is used and `spec` is
    /// dropped. The new spec's dependencies must already be registered.
    pub async fn initialize_service(self: &Arc<Self>, spec: ServiceSpec) -> Result<(), BootError> {
        let id = spec.id().to_string();
        {
            let mut table = self.table.write().await;
            if !table.contains(&id) {
                table.insert(spec)?;
            }
            table.validate()?;
        }
        self.bring_up(id).await
    }

    /// Re-creates one record as `Pending`. In-flight results for it become stale.
    pub fn reset_service(&self, id: &str) -> Result<(), BootError> {
        match self.store.dispatch(Action::ResetService { id: id.to_string() }) {
            Outcome::Rejected { status: None } => Err(BootError::UnknownService { id: id.to_string() }),
            _ => Ok(()),
        }
    }

    /// Re-creates every record as `Pending`.
    pub fn reset_all(&self) {
        self.store.dispatch(Action::ResetAll);
    }

    /// Resets `id` and brings it up again.
    pub async fn retry_service(self: &Arc<Self>, id: &str) -> Result<(), BootError> {
        if !self.table.read().await.contains(id) {
            return Err(BootError::UnknownService { id: id.to_string() });
        }
        self.reset_service(id)?;
        self.bring_up(id.to_string()).await
    }

    /// Cancels every in-flight attempt and backoff sleep.
    pub fn shutdown(&self) {
        self.runtime_token.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.runtime_token.is_cancelled()
    }

    /// Read-only state subscription.
    pub fn view(&self) -> StateView {
        self.store.view()
    }

    /// Raw event stream.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Forwards bus events to the subscriber set (fire-and-forget).
    fn subscriber_listener(&self) {
        if self.subs.is_empty() {
            return;
        }
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged behind the bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    async fn drive(self: &Arc<Self>) -> usize {
        let mut view = self.store.view();
        let mut set: JoinSet<String> = JoinSet::new();
        let mut in_flight: HashSet<String> = HashSet::new();
        let mut sweeps = 0;

        while !self.runtime_token.is_cancelled() {
            let state = view.snapshot();
            if self.sweep(&state, &mut set, &mut in_flight).await > 0 {
                sweeps += 1;
            }
            if set.is_empty() && !self.in_flight_elsewhere(&state) {
                // Work that finished after the snapshot still needs a sweep.
                if view.has_changed() {
                    continue;
                }
                break;
            }

            tokio::select! {
                _ = self.runtime_token.cancelled() => break,
                alive = view.changed() => {
                    if !alive {
                        break;
                    }
                }
                Some(done) = set.join_next() => reap(done, &mut in_flight),
            }
        }

        while let Some(done) = set.join_next().await {
            reap(done, &mut in_flight);
        }
        sweeps
    }

    /// Some record is `Initializing` or `Error` under a concurrent
    /// [`initialize_service`](Self::initialize_service) / [`retry_service`](Self::retry_service).
    /// Its outcome is a store change, so the driver keeps waiting for it.
    fn in_flight_elsewhere(&self, state: &GlobalState) -> bool {
        state
            .services
            .values()
            .any(|r| r.status.is_in_flight() && self.gate.is_busy(&r.id))
    }

    /// One pass over the table; returns how many initializations were spawned.
    async fn sweep(
        self: &Arc<Self>,
        state: &GlobalState,
        set: &mut JoinSet<String>,
        in_flight: &mut HashSet<String>,
    ) -> usize {
        let specs: Vec<ServiceSpec> = self.table.read().await.iter().cloned().collect();
        let mut started = 0;

        for spec in specs {
            let id = spec.id().to_string();
            if in_flight.contains(&id) {
                continue;
            }
            match state.status(&id) {
                Some(ServiceState::Pending | ServiceState::Blocked) => {}
                _ => continue,
            }

            let blockers = resolver::blockers(spec.descriptor(), state);
            if !blockers.is_empty() {
                self.store.dispatch(Action::ServiceBlocked {
                    id,
                    by_failure: blockers.by_failure(),
                    blocked_by: blockers.waiting,
                });
                continue;
            }

            in_flight.insert(id.clone());
            let this = Arc::clone(self);
            set.spawn(async move {
                this.gate.run(id.clone(), this.init_once(&spec)).await;
                id
            });
            started += 1;
        }
        started
    }

    /// Brings `id` up, recursively bringing up dependencies first.
    fn bring_up(self: &Arc<Self>, id: String) -> BoxFuture<'static, Result<(), BootError>> {
        let this = Arc::clone(self);
        async move {
            loop {
                if this.runtime_token.is_cancelled() {
                    return Err(BootError::Canceled);
                }
                let spec = this
                    .table
                    .read()
                    .await
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| BootError::UnknownService { id: id.clone() })?;
                this.store.dispatch(Action::RegisterService {
                    descriptor: spec.descriptor().clone(),
                });
                if let Some(done) = this.settled(&id) {
                    return done;
                }

                let mut failed = Vec::new();
                for dep in &spec.descriptor().dependencies {
                    match this.bring_up(dep.clone()).await {
                        Ok(()) => {}
                        Err(BootError::Canceled) => return Err(BootError::Canceled),
                        Err(_) => failed.push(dep.clone()),
                    }
                }
                if !failed.is_empty() {
                    this.store.dispatch(Action::ServiceBlocked {
                        id: id.clone(),
                        blocked_by: failed.clone(),
                        by_failure: true,
                    });
                    return Err(BootError::BlockedByFailure { id, failed });
                }

                this.gate.run(id.clone(), this.init_once(&spec)).await;
                if let Some(done) = this.settled(&id) {
                    return done;
                }
            }
        }
        .boxed()
    }

    /// `Some` once `id` is `Ready` or `Failed`.
    fn settled(&self, id: &str) -> Option<Result<(), BootError>> {
        self.store.read(|state| {
            let rec = state.service(id)?;
            match rec.status {
                ServiceState::Ready => Some(Ok(())),
                ServiceState::Failed => Some(Err(BootError::ServiceFailed {
                    id: id.to_string(),
                    source: rec
                        .error
                        .clone()
                        .unwrap_or_else(|| InitError::application("failed")),
                })),
                _ => None,
            }
        })
    }

    /// Commits `ServiceInit` and runs the retry loop. Must run inside the gate.
    async fn init_once(&self, spec: &ServiceSpec) {
        let ticket = match self.store.begin(spec.descriptor()) {
            Begin::Started(ticket) => ticket,
            Begin::Blocked(_) | Begin::Skipped(_) | Begin::Unknown => return,
        };

        let policy = spec.effective_retry(&self.cfg);
        let reporter = StoreReporter {
            store: &self.store,
            ticket: &ticket,
        };
        let service = Arc::clone(spec.service());

        let res = retry_with_backoff(&ticket.id, &policy, &reporter, &self.runtime_token, |ctx| {
            let service = Arc::clone(&service);
            async move {
                match AssertUnwindSafe(service.initialize(ctx)).catch_unwind().await {
                    Ok(res) => res,
                    Err(panic) => Err(InitError::fatal(format!(
                        "panicked: {}",
                        panic_message(panic.as_ref())
                    ))),
                }
            }
        })
        .await;

        let action = match res {
            Ok(()) => Action::ServiceReady { ticket },
            Err(InitError::Canceled) if self.runtime_token.is_cancelled() => {
                Action::ServiceAborted { ticket }
            }
            Err(error) => Action::ServiceError {
                ticket,
                error,
                terminal: true,
            },
        };
        self.store.dispatch(action);
    }
}

fn reap(done: Result<String, JoinError>, in_flight: &mut HashSet<String>) {
    match done {
        Ok(id) => {
            in_flight.remove(&id);
        }
        Err(e) => tracing::error!(error = %e, "initialization task did not complete"),
    }
}

/// Mirrors retry progress into the store and onto the bus.
struct StoreReporter<'a> {
    store: &'a Store,
    ticket: &'a Ticket,
}

impl StoreReporter<'_> {
    fn publish_failure(&self, key: &str, attempt: u32, error: &InitError) {
        let bus = self.store.bus();
        if let InitError::Timeout { timeout } = error {
            bus.publish(
                Event::new(EventKind::TimeoutHit)
                    .with_service(key)
                    .with_attempt(attempt)
                    .with_timeout(*timeout),
            );
        }
        bus.publish(
            Event::new(EventKind::AttemptFailed)
                .with_service(key)
                .with_attempt(attempt)
                .with_reason(error.to_string()),
        );
    }
}

impl RetryObserver for StoreReporter<'_> {
    fn on_attempt(&self, _key: &str, attempt: u32) {
        if attempt > 1 {
            self.store.dispatch(Action::ServiceRetry {
                ticket: self.ticket.clone(),
                attempt,
            });
        }
    }

    fn on_retry(&self, key: &str, attempt: u32, error: &InitError, delay: Duration) {
        self.publish_failure(key, attempt, error);
        self.store.dispatch(Action::ServiceError {
            ticket: self.ticket.clone(),
            error: error.clone(),
            terminal: false,
        });
        self.store.bus().publish(
            Event::new(EventKind::BackoffScheduled)
                .with_service(key)
                .with_attempt(attempt)
                .with_delay(delay),
        );
    }

    fn on_exhausted(&self, key: &str, attempts: u32, error: &InitError) {
        self.publish_failure(key, attempts, error.root_cause());
    }
}
