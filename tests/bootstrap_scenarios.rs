use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use bootvisor::{
    BackoffPolicy, BootError, Config, ConfigError, Event, EventKind, InitError, Orchestrator,
    RetryPolicy, ServiceSpec, ServiceState,
};
use tokio::sync::broadcast;
use tokio::time;

fn ok(id: &str, deps: &[&str]) -> ServiceSpec {
    ServiceSpec::builder(id)
        .depends_on(deps.iter().copied())
        .build(|_ctx| async { Ok(()) })
}

/// Service that fails until it has been called `succeed_on` times (0 = always fails).
fn counted(id: &str, deps: &[&str], calls: Arc<AtomicU32>, succeed_on: u32) -> ServiceSpec {
    ServiceSpec::builder(id)
        .depends_on(deps.iter().copied())
        .build(move |_ctx| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if succeed_on != 0 && n >= succeed_on {
                    Ok(())
                } else {
                    Err(InitError::application(format!("attempt {n} refused")))
                }
            }
        })
}

fn sleeper(id: &str, deps: &[&str], ms: u64) -> ServiceSpec {
    ServiceSpec::builder(id)
        .depends_on(deps.iter().copied())
        .build(move |_ctx| async move {
            time::sleep(Duration::from_millis(ms)).await;
            Ok(())
        })
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

fn kinds_for(events: &[Event], id: &str) -> Vec<EventKind> {
    events
        .iter()
        .filter(|e| e.service.as_deref() == Some(id))
        .map(|e| e.kind)
        .collect()
}

/// Replays the event stream and asserts no service started before its dependencies were ready.
fn assert_dependency_order(events: &[Event], deps: &HashMap<&str, Vec<&str>>) {
    let mut ready: HashSet<String> = HashSet::new();
    for ev in events {
        let id = ev.service.as_deref().unwrap_or_default();
        match ev.kind {
            EventKind::ServiceReady => {
                ready.insert(id.to_string());
            }
            EventKind::ServiceReset | EventKind::ServiceRegistered => {
                ready.remove(id);
            }
            EventKind::StoreReset => ready.clear(),
            EventKind::ServiceInitializing => {
                for dep in deps.get(id).into_iter().flatten() {
                    assert!(
                        ready.contains(*dep),
                        "{id} started (seq {}) before {dep} was ready",
                        ev.seq
                    );
                }
            }
            _ => {}
        }
    }
}

#[tokio::test(start_paused = true)]
async fn scenario_a_fan_out_starts_root_first() {
    let orch = Orchestrator::builder(Config::default())
        .with_services(vec![ok("a", &[]), ok("b", &["a"]), ok("c", &["a"])])
        .build();
    let mut rx = orch.events();

    let report = orch.run().await.expect("valid table");
    assert!(report.is_ready());

    let order = &report.state.initialization_order;
    assert_eq!(order.len(), 3);
    assert_eq!(order[0], "a");
    assert!(order.contains(&"b".to_string()));
    assert!(order.contains(&"c".to_string()));

    let events = drain(&mut rx);
    assert_eq!(
        events.iter().filter(|e| e.kind == EventKind::SystemReady).count(),
        1
    );
    assert_dependency_order(
        &events,
        &HashMap::from([("a", vec![]), ("b", vec!["a"]), ("c", vec!["a"])]),
    );
}

#[tokio::test(start_paused = true)]
async fn scenario_b_exhausts_exactly_three_attempts() {
    for critical in [true, false] {
        let calls = Arc::new(AtomicU32::new(0));
        let mut spec = counted("a", &[], calls.clone(), 0);
        if critical {
            spec = ServiceSpec::builder("a")
                .critical()
                .build_from_service(spec.service().clone());
        }
        let orch = Orchestrator::builder(Config::default()).service(spec).build();
        let mut rx = orch.events();

        let report = orch.run().await.expect("valid table");
        let rec = &report.state.services["a"];

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(rec.status, ServiceState::Failed);
        assert_eq!(rec.retry_count, 3);
        assert!(matches!(
            rec.error,
            Some(InitError::MaxRetriesExceeded { attempts: 3, .. })
        ));
        assert_eq!(report.state.has_critical_failure, critical);
        assert!(!report.is_ready());

        let events = drain(&mut rx);
        assert!(events.iter().all(|e| e.kind != EventKind::SystemReady));
        assert_eq!(
            events.iter().filter(|e| e.kind == EventKind::AttemptFailed).count(),
            3
        );
        assert_eq!(
            events.iter().filter(|e| e.kind == EventKind::BackoffScheduled).count(),
            2
        );

        match report.into_result() {
            Err(BootError::CriticalFailure { id, .. }) => {
                assert!(critical);
                assert_eq!(id, "a");
            }
            Ok(state) => {
                assert!(!critical);
                assert_eq!(state.status("a"), Some(ServiceState::Failed));
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn scenario_c_timeout_leaves_dependent_blocked() {
    let hang = ServiceSpec::builder("a")
        .timeout(Duration::from_millis(100))
        .build(|_ctx| std::future::pending());
    let orch = Orchestrator::builder(Config::default())
        .with_services(vec![hang, ok("b", &["a"])])
        .build();
    let mut rx = orch.events();

    let report = orch.run().await.expect("valid table");

    let a = &report.state.services["a"];
    assert_eq!(a.status, ServiceState::Failed);
    let err = a.error.as_ref().expect("failed records carry an error");
    assert_eq!(
        err.root_cause(),
        &InitError::Timeout {
            timeout: Duration::from_millis(100)
        }
    );

    let b = &report.state.services["b"];
    assert_eq!(b.status, ServiceState::Blocked);
    assert!(b.blocked_by_failure);
    assert_eq!(b.blocked_by, vec!["a"]);

    let events = drain(&mut rx);
    assert!(!kinds_for(&events, "b").contains(&EventKind::ServiceInitializing));
    assert_eq!(
        events.iter().filter(|e| e.kind == EventKind::TimeoutHit).count(),
        3
    );
}

#[tokio::test]
async fn scenario_d_cycle_is_rejected_before_any_initialization() {
    let calls = Arc::new(AtomicU32::new(0));
    let orch = Orchestrator::builder(Config::default())
        .with_services(vec![
            counted("a", &["b"], calls.clone(), 1),
            counted("b", &["a"], calls.clone(), 1),
        ])
        .build();
    let mut rx = orch.events();

    let err = orch.run().await.expect_err("cyclic table");
    assert_eq!(
        err,
        BootError::Configuration(ConfigError::Cycle {
            path: vec!["a".into(), "b".into(), "a".into()]
        })
    );
    assert_eq!(err.to_string(), "invalid service table: circular dependency detected: a -> b -> a");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn dependency_order_holds_with_uneven_latencies_and_retries() {
    let flaky_calls = Arc::new(AtomicU32::new(0));
    let specs = vec![
        sleeper("config", &[], 5),
        sleeper("db", &["config"], 40),
        counted("cache", &["config"], flaky_calls.clone(), 2),
        sleeper("queue", &["config"], 1),
        sleeper("api", &["db", "cache"], 10),
        sleeper("worker", &["queue", "db"], 3),
        sleeper("web", &["api"], 2),
    ];
    let deps = HashMap::from([
        ("config", vec![]),
        ("db", vec!["config"]),
        ("cache", vec!["config"]),
        ("queue", vec!["config"]),
        ("api", vec!["db", "cache"]),
        ("worker", vec!["queue", "db"]),
        ("web", vec!["api"]),
    ]);

    let mut cfg = Config::default();
    cfg.retry = RetryPolicy::default().with_backoff(BackoffPolicy::constant(Duration::from_millis(20)));
    let orch = Orchestrator::builder(cfg).with_services(specs).build();
    let mut rx = orch.events();

    let report = orch.run().await.expect("valid table");
    assert!(report.is_ready());
    assert_eq!(flaky_calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.state.services["cache"].retry_count, 1);
    // Every sweep that makes progress starts at least one service.
    assert!(report.sweeps <= deps.len());

    let events = drain(&mut rx);
    assert_dependency_order(&events, &deps);

    let order = &report.state.initialization_order;
    let pos = |id: &str| order.iter().position(|x| x == id).expect("ready");
    for (id, ds) in &deps {
        for d in ds {
            assert!(pos(*d) < pos(*id), "{d} must precede {id} in {order:?}");
        }
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_initialize_calls_for_one_service_never_overlap() {
    let active = Arc::new(AtomicUsize::new(0));
    let calls = Arc::new(AtomicU32::new(0));
    let spec = {
        let (active, calls) = (active.clone(), calls.clone());
        ServiceSpec::builder("db").build(move |_ctx| {
            let (active, calls) = (active.clone(), calls.clone());
            async move {
                assert_eq!(active.fetch_add(1, Ordering::SeqCst), 0, "overlapping init");
                calls.fetch_add(1, Ordering::SeqCst);
                time::sleep(Duration::from_millis(50)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
    };
    let orch = Orchestrator::builder(Config::default()).build();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let (orch, spec) = (orch.clone(), spec.clone());
        handles.push(tokio::spawn(async move { orch.initialize_service(spec).await }));
    }
    for h in handles {
        assert_eq!(h.await.expect("task"), Ok(()));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(orch.view().is_ready());
}

#[tokio::test(start_paused = true)]
async fn reset_all_turns_in_flight_results_stale() {
    let calls = Arc::new(AtomicU32::new(0));
    let spec = {
        let calls = calls.clone();
        ServiceSpec::builder("slow").build(move |_ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                time::sleep(Duration::from_secs(1)).await;
                Ok(())
            }
        })
    };
    let orch = Orchestrator::builder(Config::default()).service(spec).build();
    let mut rx = orch.events();

    let resetter = {
        let orch = orch.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(500)).await;
            orch.reset_all();
        })
    };

    let report = orch.run().await.expect("valid table");
    resetter.await.expect("resetter");

    assert!(report.is_ready());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let events = drain(&mut rx);
    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
    let reset_at = kinds.iter().position(|k| *k == EventKind::StoreReset).expect("reset");
    let stale_at = kinds
        .iter()
        .position(|k| *k == EventKind::StaleUpdateIgnored)
        .expect("late result ignored");
    assert!(reset_at < stale_at);
    assert_eq!(
        kinds.iter().filter(|k| **k == EventKind::ServiceReady).count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn non_critical_failure_does_not_stop_the_rest() {
    let calls = Arc::new(AtomicU32::new(0));
    let orch = Orchestrator::builder(Config::default())
        .with_services(vec![
            ServiceSpec::builder("db").critical().build(|_ctx| async { Ok(()) }),
            counted("metrics", &[], calls, 0),
            ok("api", &["db"]),
            ok("dashboard", &["metrics"]),
        ])
        .build();

    let report = orch.run().await.expect("valid table");
    assert_eq!(report.ids_in(ServiceState::Ready), vec!["api", "db"]);
    assert_eq!(report.ids_in(ServiceState::Failed), vec!["metrics"]);
    assert_eq!(report.ids_in(ServiceState::Blocked), vec!["dashboard"]);
    assert!(!report.state.has_critical_failure);
    assert!(!report.is_ready());

    let state = report.into_result().expect("no critical failure");
    assert!(state.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn blocked_by_failure_waits_for_an_explicit_retry() {
    let calls = Arc::new(AtomicU32::new(0));
    let flaky = counted("a", &[], calls.clone(), 2).with_retry(RetryPolicy::once());
    let orch = Orchestrator::builder(Config::default())
        .with_services(vec![flaky, ok("b", &["a"])])
        .build();

    let first = orch.run().await.expect("valid table");
    assert_eq!(first.state.status("a"), Some(ServiceState::Failed));
    assert_eq!(first.state.status("b"), Some(ServiceState::Blocked));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Bringing b up directly does not touch the failed dependency.
    assert_eq!(
        orch.initialize_service(ok("b", &["a"])).await,
        Err(BootError::BlockedByFailure {
            id: "b".into(),
            failed: vec!["a".into()]
        })
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    orch.retry_service("a").await.expect("second call succeeds");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let second = orch.run().await.expect("valid table");
    assert!(second.is_ready());
    assert_eq!(second.state.initialization_order, vec!["a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn retry_count_never_exceeds_the_budget() {
    for max in 1..=4u32 {
        let calls = Arc::new(AtomicU32::new(0));
        let spec = counted("x", &[], calls.clone(), 0).with_retry(
            RetryPolicy::default()
                .with_max_attempts(max)
                .with_backoff(BackoffPolicy::constant(Duration::from_millis(5))),
        );
        let orch = Orchestrator::builder(Config::default()).service(spec).build();
        let mut view = orch.view();

        let report = orch.run().await.expect("valid table");
        assert_eq!(calls.load(Ordering::SeqCst), max);
        assert_eq!(report.state.services["x"].retry_count, max);

        // Terminal: a second run does not start it again.
        orch.run().await.expect("valid table");
        assert_eq!(calls.load(Ordering::SeqCst), max);
        assert_eq!(view.snapshot().services["x"].retry_count, max);
    }
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_backoff_returns_record_to_pending() {
    let calls = Arc::new(AtomicU32::new(0));
    let orch = Orchestrator::builder(Config::default())
        .service(counted("db", &[], calls.clone(), 0))
        .build();

    let stopper = {
        let orch = orch.clone();
        tokio::spawn(async move {
            // Inside the first backoff sleep (1.5s after attempt 1).
            time::sleep(Duration::from_millis(700)).await;
            orch.shutdown();
        })
    };

    assert_eq!(orch.run().await.map(|_| ()), Err(BootError::Canceled));
    stopper.await.expect("stopper");
    assert!(orch.is_shut_down());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(orch.view().status("db"), Some(ServiceState::Pending));
}

#[tokio::test(start_paused = true)]
async fn view_settles_while_run_is_in_progress() {
    let orch = Orchestrator::builder(Config::default())
        .with_services(vec![sleeper("db", &[], 30), sleeper("api", &["db"], 30)])
        .build();
    let mut view = orch.view();

    let runner = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.run().await })
    };

    // An empty store is vacuously ready; wait for the registered table.
    let settled = view
        .wait_for(|s| s.ready && s.services.len() == 2)
        .await
        .expect("store alive");
    assert!(settled.ready);
    assert!(view.is_service_ready("api"));
    assert_eq!(view.summary().ready, 2);

    let report = runner.await.expect("runner").expect("valid table");
    assert!(report.is_ready());
}

#[tokio::test(start_paused = true)]
async fn run_waits_for_a_concurrent_initialize_service() {
    let orch = Orchestrator::builder(Config::default())
        .with_services(vec![sleeper("a", &[], 1_000), ok("b", &["a"])])
        .build();

    let lazy = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.initialize_service(sleeper("a", &[], 1_000)).await })
    };
    time::sleep(Duration::from_millis(10)).await;
    assert_eq!(orch.view().status("a"), Some(ServiceState::Initializing));

    let report = orch.run().await.expect("valid table");
    assert!(report.is_ready());
    assert_eq!(report.state.initialization_order, vec!["a", "b"]);
    assert_eq!(lazy.await.expect("lazy init"), Ok(()));
}
