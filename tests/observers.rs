use ferrous_inject::{
    injectable, ContainerBuilder, DiError, DiObserver, Lifetime, MetricsObserver, ResolutionEvent, Resolver,
    ScopeId, TracingObserver,
};
use parking_lot::Mutex;
use std::any::type_name;
use std::sync::Arc;
use tracing_test::traced_test;

struct Database;
injectable!(Database);

struct Repository {
    _db: Arc<Database>,
}
injectable!(Repository { _db: Database });

struct Missing;
injectable!(Missing);

struct Broken {
    _missing: Arc<Missing>,
}
injectable!(Broken { _missing: Missing });

#[derive(Default)]
struct Recorder {
    resolved: Mutex<Vec<(&'static str, bool, ScopeId)>>,
    failed: Mutex<Vec<&'static str>>,
    created: Mutex<Vec<(ScopeId, Option<ScopeId>)>>,
    disposed: Mutex<Vec<(ScopeId, usize)>>,
}

impl DiObserver for Recorder {
    fn resolved(&self, event: &ResolutionEvent<'_>) {
        self.resolved.lock().push((event.contract, event.reused, event.scope));
    }

    fn resolution_failed(&self, contract: &'static str, _error: &DiError) {
        self.failed.lock().push(contract);
    }

    fn scope_created(&self, scope: ScopeId, parent: Option<ScopeId>) {
        self.created.lock().push((scope, parent));
    }

    fn scope_disposed(&self, scope: ScopeId, released: usize) {
        self.disposed.lock().push((scope, released));
    }
}

fn builder() -> ContainerBuilder {
    let mut builder = ContainerBuilder::new();
    builder
        .add_singleton::<Database>()
        .unwrap()
        .add_transient::<Repository>()
        .unwrap()
        .add_transient::<Broken>()
        .unwrap();
    builder
}

#[test]
fn test_metrics_observer_counts_resolutions() {
    let metrics = Arc::new(MetricsObserver::new());
    let mut builder = builder();
    builder.add_observer(metrics.clone());
    let container = builder.build().unwrap();

    container.resolve::<Repository>().unwrap();
    container.resolve::<Repository>().unwrap();

    let repository = metrics.stats_for(type_name::<Repository>()).unwrap();
    assert_eq!(repository.resolved, 2);
    assert_eq!(repository.reused, 0);

    // nested resolutions are reported too; the second one hits the cached singleton
    let database = metrics.stats_for(type_name::<Database>()).unwrap();
    assert_eq!(database.resolved, 2);
    assert_eq!(database.reused, 1);
    assert_eq!(metrics.total_resolutions(), 4);

    metrics.reset();
    assert!(metrics.snapshot().is_empty());
}

#[test]
fn test_metrics_observer_counts_failures() {
    let metrics = Arc::new(MetricsObserver::new());
    let mut builder = builder();
    builder.add_observer(metrics.clone());
    let container = builder.build().unwrap();

    assert!(container.resolve::<Broken>().is_err());

    assert_eq!(metrics.stats_for(type_name::<Broken>()).unwrap().failed, 1);
    assert_eq!(metrics.stats_for(type_name::<Missing>()).unwrap().failed, 1);
    assert_eq!(metrics.total_resolutions(), 0);
}

#[test]
fn test_resolve_all_failures_are_reported() {
    let metrics = Arc::new(MetricsObserver::new());
    let mut builder = builder();
    builder.add_observer(metrics.clone());
    let container = builder.build().unwrap();

    assert!(container.resolve_all::<Broken>().is_err());
    assert_eq!(metrics.stats_for(type_name::<Broken>()).unwrap().failed, 1);

    let all = container.resolve_all::<Repository>().unwrap();
    assert_eq!(all.len(), 1);
    let repository = metrics.stats_for(type_name::<Repository>()).unwrap();
    assert_eq!((repository.resolved, repository.failed), (1, 0));
}

#[test]
fn test_custom_observer_sees_scope_lifecycle() {
    let recorder = Arc::new(Recorder::default());
    let mut builder = builder();
    builder.add_observer(recorder.clone());
    let root = builder.build().unwrap();
    let child = root.create_scope().unwrap();

    child.resolve::<Database>().unwrap();
    child.dispose();

    let created = recorder.created.lock().clone();
    assert_eq!(created, vec![(root.id(), None), (child.id(), Some(root.id()))]);
    assert_eq!(*recorder.disposed.lock(), vec![(child.id(), 0)]);

    let resolved = recorder.resolved.lock().clone();
    assert_eq!(resolved, vec![(type_name::<Database>(), false, child.id())]);
}

#[test]
fn test_child_observers_do_not_leak_to_parent() {
    let parent_recorder = Arc::new(Recorder::default());
    let child_recorder = Arc::new(Recorder::default());

    let mut builder = builder();
    builder.add_observer(parent_recorder.clone());
    let root = builder.build().unwrap();

    let child_observer = child_recorder.clone();
    let child = root
        .create_scope_with(move |b| {
            b.add_observer(child_observer);
            b.add_factory(Lifetime::Scoped, |_| Ok(7u8))?;
            Ok(())
        })
        .unwrap();

    child.resolve::<u8>().unwrap();
    root.resolve::<Database>().unwrap();

    assert_eq!(parent_recorder.resolved.lock().len(), 2);
    assert_eq!(child_recorder.resolved.lock().len(), 1);
    assert_eq!(child_recorder.resolved.lock()[0].0, type_name::<u8>());
}

#[test]
fn test_scoped_reuse_is_reported() {
    let metrics = Arc::new(MetricsObserver::new());
    let mut builder = ContainerBuilder::new();
    builder
        .add_observer(metrics.clone())
        .add_factory(Lifetime::Scoped, |_| Ok(String::from("request")))
        .unwrap();
    let root = builder.build().unwrap();
    let scope = root.create_scope().unwrap();

    scope.resolve::<String>().unwrap();
    scope.resolve::<String>().unwrap();
    scope.resolve::<String>().unwrap();

    let stats = metrics.stats_for(type_name::<String>()).unwrap();
    assert_eq!(stats.resolved, 3);
    assert_eq!(stats.reused, 2);
}

#[test]
#[traced_test]
fn test_tracing_observer_logs_events() {
    let mut builder = builder();
    builder.add_observer(Arc::new(TracingObserver::new()));
    let container = builder.build().unwrap();

    container.resolve::<Repository>().unwrap();
    assert!(container.resolve::<Broken>().is_err());
    container.create_scope().unwrap().dispose();

    assert!(logs_contain("resolved"));
    assert!(logs_contain("resolution failed"));
    assert!(logs_contain("scope created"));
    assert!(logs_contain("scope disposed"));
}
