use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

use switchyard::container::{
    Container, Injectable, Lifecycle, NamedArgs, Resolution, ResolveError, ServiceKey,
};

mod common;
use common::tracing_util::TestTracing;

struct Database {
    dsn: String,
}

struct Repository {
    db: Arc<Database>,
}

impl Injectable for Repository {
    fn construct(r: &mut Resolution<'_>) -> Result<Self, ResolveError> {
        Ok(Self { db: r.get::<Database>()? })
    }
}

/// Dependencies resolved through the container plus a built-in default.
struct Mailer {
    repo: Arc<Repository>,
    retries: u32,
}

impl Injectable for Mailer {
    fn construct(r: &mut Resolution<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            repo: r.make::<Repository>()?,
            retries: 3,
        })
    }
}

#[test]
fn test_autowired_graph_uses_bindings_and_defaults() {
    let mut c = Container::new();
    c.singleton::<Database, _>(|_| {
        Ok(Database {
            dsn: "sqlite::memory:".to_string(),
        })
    });

    let mailer = c.make::<Mailer>().unwrap();
    assert_eq!(mailer.retries, 3);
    assert_eq!(mailer.repo.db.dsn, "sqlite::memory:");

    let again = c.make::<Mailer>().unwrap();
    assert!(!Arc::ptr_eq(&mailer, &again));
    assert!(Arc::ptr_eq(&mailer.repo.db, &again.repo.db));
}

#[test]
fn test_missing_transitive_dependency_is_reported() {
    let c = Container::new();
    match c.make::<Mailer>() {
        Err(ResolveError::UnresolvableDependency { key }) => assert!(key.ends_with("Database")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a missing Database"),
    }
}

#[test]
fn test_concurrent_singleton_constructed_once() {
    const THREADS: usize = 16;
    let calls = Arc::new(AtomicUsize::new(0));
    let mut c = Container::new();
    let counter = Arc::clone(&calls);
    c.singleton::<Database, _>(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        Ok(Database {
            dsn: "shared".to_string(),
        })
    });
    let c = Arc::new(c);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let c = Arc::clone(&c);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                c.get::<Database>().unwrap()
            })
        })
        .collect();
    let instances: Vec<Arc<Database>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
}

#[test]
fn test_failed_singleton_can_retry() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let mut c = Container::new();
    let counter = Arc::clone(&attempts);
    c.singleton::<Database, _>(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(ResolveError::construction("Database", "connection refused"))
        } else {
            Ok(Database {
                dsn: "second".to_string(),
            })
        }
    });

    let err = c.get::<Database>().map(|_| ()).unwrap_err();
    assert!(err.to_string().contains("connection refused"));
    assert_eq!(c.get::<Database>().unwrap().dsn, "second");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

struct Alpha;
struct Beta;
struct Gamma;

#[test]
fn test_three_step_cycle_is_detected_with_chain() {
    let logs = TestTracing::init();
    let mut c = Container::new();
    c.singleton::<Alpha, _>(|r| {
        r.get::<Beta>()?;
        Ok(Alpha)
    });
    c.bind::<Beta, _>(|r| {
        r.get::<Gamma>()?;
        Ok(Beta)
    });
    c.singleton::<Gamma, _>(|r| {
        r.get::<Alpha>()?;
        Ok(Gamma)
    });

    let err = c.get::<Alpha>().map(|_| ()).unwrap_err();
    match &err {
        ResolveError::CyclicDependency { chain } => {
            let short: Vec<&str> = chain
                .iter()
                .map(|k| k.rsplit("::").next().unwrap())
                .collect();
            assert_eq!(short, ["Alpha", "Beta", "Gamma", "Alpha"]);
        }
        other => panic!("expected cycle, got {other}"),
    }
    assert!(err.to_string().starts_with("cyclic dependency: "));
    assert_eq!(err.to_string().matches(" -> ").count(), 3);
    assert!(!logs.events("Cyclic dependency detected").is_empty());

    // Nothing half-built is cached: a cycle fails the same way again.
    assert!(matches!(
        c.get::<Gamma>(),
        Err(ResolveError::CyclicDependency { .. })
    ));
}

struct Ping;
struct Pong;

/// Resolve each key on its own thread, both released together, and collect
/// the outcomes. A hang shows up as a failed `recv_timeout`.
fn resolve_in_parallel(c: Container) -> Vec<Result<(), ResolveError>> {
    let c = Arc::new(c);
    let barrier = Arc::new(Barrier::new(2));
    let (tx, rx) = mpsc::channel();
    let lookups: [fn(&Container) -> Result<(), ResolveError>; 2] = [
        |c| c.get::<Ping>().map(|_| ()),
        |c| c.get::<Pong>().map(|_| ()),
    ];
    for lookup in lookups {
        let c = Arc::clone(&c);
        let barrier = Arc::clone(&barrier);
        let tx = tx.clone();
        thread::spawn(move || {
            barrier.wait();
            tx.send(lookup(&c)).unwrap();
        });
    }
    (0..2)
        .map(|_| rx.recv_timeout(Duration::from_secs(10)).unwrap())
        .collect()
}

#[test]
fn test_cycle_split_across_threads_fails_instead_of_blocking() {
    let mut c = Container::new();
    c.singleton::<Ping, _>(|r| {
        thread::sleep(Duration::from_millis(50));
        r.get::<Pong>()?;
        Ok(Ping)
    });
    c.singleton::<Pong, _>(|r| {
        thread::sleep(Duration::from_millis(50));
        r.get::<Ping>()?;
        Ok(Pong)
    });

    for result in resolve_in_parallel(c) {
        assert!(
            matches!(result, Err(ResolveError::CyclicDependency { .. })),
            "{result:?}"
        );
    }
}

#[test]
fn test_nested_singletons_from_two_threads_share_instances() {
    let builds = Arc::new(AtomicUsize::new(0));
    let mut c = Container::new();
    let counter = Arc::clone(&builds);
    c.singleton::<Ping, _>(move |r| {
        counter.fetch_add(1, Ordering::SeqCst);
        r.get::<Pong>()?;
        Ok(Ping)
    });
    let counter = Arc::clone(&builds);
    c.singleton::<Pong, _>(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        Ok(Pong)
    });

    for result in resolve_in_parallel(c) {
        assert!(result.is_ok(), "{result:?}");
    }
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[test]
fn test_named_bindings_share_table_with_types() {
    let mut c = Container::new();
    c.instance(Database {
        dsn: "primary".to_string(),
    });
    c.singleton_named::<Database, _>("db.replica", |_| {
        Ok(Database {
            dsn: "replica".to_string(),
        })
    });
    c.alias("db", ServiceKey::of::<Database>());

    assert_eq!(c.get_named::<Database>("db").unwrap().dsn, "primary");
    assert_eq!(c.get_named::<Database>("db.replica").unwrap().dsn, "replica");
    assert_eq!(
        c.lifecycle(&ServiceKey::named("db.replica")),
        Some(Lifecycle::Singleton)
    );
    assert!(c.has(&ServiceKey::named("db")));
    assert!(!c.has(&ServiceKey::named("db.cache")));
}

#[test]
fn test_call_resolves_named_then_container_then_default() {
    let mut c = Container::new();
    c.instance(Database {
        dsn: "bound".to_string(),
    });

    let named = NamedArgs::new().with("limit", 25usize);
    let (dsn, limit, offset) = c
        .call(named, |args| -> Result<_, ResolveError> {
            let db = args.service::<Database>("db")?;
            let limit: usize = args.value("limit")?;
            let offset = args.value_or("offset", 0usize)?;
            Ok((db.dsn.clone(), limit, offset))
        })
        .unwrap();
    assert_eq!((dsn.as_str(), limit, offset), ("bound", 25, 0));

    let err = c
        .call(NamedArgs::new(), |args| args.value::<usize>("limit"))
        .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::UnresolvableParameter { ref parameter, .. } if parameter == "limit"
    ));
}

#[test]
fn test_named_argument_overrides_binding() {
    let mut c = Container::new();
    c.instance(Database {
        dsn: "bound".to_string(),
    });
    let explicit = NamedArgs::new().with(
        "db",
        Database {
            dsn: "explicit".to_string(),
        },
    );
    let dsn = c
        .call(explicit, |args| {
            args.service::<Database>("db").map(|db| db.dsn.clone())
        })
        .unwrap();
    assert_eq!(dsn, "explicit");
}

#[test]
fn test_warm_up_surfaces_errors_before_traffic() {
    let mut c = Container::new();
    c.singleton_self::<Repository>();
    assert!(matches!(
        c.warm_up(),
        Err(ResolveError::UnresolvableDependency { .. })
    ));

    c.instance(Database {
        dsn: "late".to_string(),
    });
    assert_eq!(c.warm_up().unwrap(), 1);
}
