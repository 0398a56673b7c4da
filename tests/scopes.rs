use ferrous_inject::{injectable, Binding, ContainerBuilder, DiError, Injectable, Lifetime, Resolver, ShapeBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Database;
injectable!(Database);

struct RequestContext;
injectable!(RequestContext);

struct Handler {
    db: Arc<Database>,
    request: Arc<RequestContext>,
}
injectable!(Handler { db: Database, request: RequestContext });

fn root() -> ferrous_inject::Container {
    let mut builder = ContainerBuilder::new();
    builder
        .add_singleton::<Database>()
        .unwrap()
        .add_scoped::<RequestContext>()
        .unwrap()
        .add_transient::<Handler>()
        .unwrap();
    builder.build().unwrap()
}

#[test]
fn test_scoped_isolation_between_siblings() {
    let root = root();
    let left = root.create_scope().unwrap();
    let right = root.create_scope().unwrap();

    let l1 = left.resolve::<RequestContext>().unwrap();
    let l2 = left.resolve::<RequestContext>().unwrap();
    let r1 = right.resolve::<RequestContext>().unwrap();

    assert!(Arc::ptr_eq(&l1, &l2));
    assert!(!Arc::ptr_eq(&l1, &r1));
}

#[test]
fn test_singletons_shared_by_descendants() {
    let root = root();
    let child = root.create_scope().unwrap();
    let grandchild = child.create_scope().unwrap();

    let from_grandchild = grandchild.resolve::<Database>().unwrap();
    let from_root = root.resolve::<Database>().unwrap();
    assert!(Arc::ptr_eq(&from_grandchild, &from_root));

    let handler = grandchild.resolve::<Handler>().unwrap();
    assert!(Arc::ptr_eq(&handler.db, &from_root));
    assert!(Arc::ptr_eq(&handler.request, &grandchild.resolve::<RequestContext>().unwrap()));
    assert!(!Arc::ptr_eq(&handler.request, &child.resolve::<RequestContext>().unwrap()));
}

#[test]
fn test_scoped_is_anchored_where_resolve_is_called() {
    let root = root();
    let child = root.create_scope().unwrap();

    let in_root = root.resolve::<RequestContext>().unwrap();
    let in_child = child.resolve::<RequestContext>().unwrap();
    assert!(!Arc::ptr_eq(&in_root, &in_child));
}

#[test]
fn test_child_registration_owns_its_singleton() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();

    let root = root();
    let child = root
        .create_scope_with(move |b| {
            b.bind(Binding::<Database>::factory(Lifetime::Singleton, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Database)
            }))?;
            Ok(())
        })
        .unwrap();
    let grandchild = child.create_scope().unwrap();

    let root_db = root.resolve::<Database>().unwrap();
    let child_db = child.resolve::<Database>().unwrap();
    let grandchild_db = grandchild.resolve::<Database>().unwrap();

    assert!(!Arc::ptr_eq(&root_db, &child_db));
    assert!(Arc::ptr_eq(&child_db, &grandchild_db));
    assert_eq!(built.load(Ordering::SeqCst), 1);

    // the transient handler built in the grandchild sees the child's database
    let handler = grandchild.resolve::<Handler>().unwrap();
    assert!(Arc::ptr_eq(&handler.db, &child_db));
}

#[test]
fn test_singleton_dependencies_resolve_in_owning_scope() {
    struct Cache {
        db: Arc<Database>,
    }
    injectable!(Cache { db: Database });

    let root = root();
    let child = root
        .create_scope_with(|b| {
            b.add_singleton::<Cache>()?;
            b.bind(Binding::<Database>::factory(Lifetime::Singleton, |_| Ok(Database)))?;
            Ok(())
        })
        .unwrap();

    let cache = child.resolve::<Cache>().unwrap();
    assert!(Arc::ptr_eq(&cache.db, &child.resolve::<Database>().unwrap()));
    assert!(!Arc::ptr_eq(&cache.db, &root.resolve::<Database>().unwrap()));
}

#[test]
fn test_child_additions_do_not_leak_to_parent() {
    let root = root();
    let child = root
        .create_scope_with(|b| {
            b.add_instance(String::from("child only"))?;
            Ok(())
        })
        .unwrap();

    assert!(child.is_registered::<String>());
    assert!(!root.is_registered::<String>());
    assert!(matches!(root.resolve::<String>(), Err(DiError::UnregisteredType { .. })));
    assert_eq!(child.resolve::<String>().unwrap().as_str(), "child only");
}

#[test]
fn test_scope_tree_navigation() {
    let root = root();
    let child = root.create_named_scope("request", |_| Ok(())).unwrap();
    let grandchild = child.create_scope().unwrap();

    assert!(root.is_root());
    assert_eq!(root.depth(), 0);
    assert_eq!(child.depth(), 1);
    assert_eq!(grandchild.depth(), 2);
    assert_eq!(child.name(), Some("request"));
    assert_eq!(grandchild.parent_id(), Some(child.id()));
    assert_eq!(child.parent().unwrap().map(|p| p.id()), Some(root.id()));
    assert!(root.parent().unwrap().is_none());
    assert_eq!(root.live_children().len(), 1);

    drop(grandchild);
    assert!(child.live_children().is_empty());
}

#[test]
fn test_released_parent_is_reported() {
    let child = {
        let root = root();
        root.create_scope().unwrap()
    };

    assert!(matches!(child.parent(), Err(DiError::ParentReleased(_))));
    assert!(matches!(child.resolve::<Database>(), Err(DiError::ParentReleased(_))));
}

#[test]
fn test_released_parent_fails_optional_dependencies() {
    struct Metrics;
    injectable!(Metrics);

    struct Reporter {
        _metrics: Option<Arc<Metrics>>,
    }
    impl Injectable for Reporter {
        fn shape(shape: &mut ShapeBuilder<Self>) {
            shape
                .constructor("new", |args| Ok(Reporter { _metrics: args.next_optional()? }))
                .optional::<Metrics>("metrics");
        }
    }

    let child = {
        let mut builder = ContainerBuilder::new();
        builder.add_singleton::<Metrics>().unwrap();
        let root = builder.build().unwrap();
        root.create_scope_with(|b| {
            b.add_transient::<Reporter>()?;
            Ok(())
        })
        .unwrap()
    };

    assert!(matches!(child.resolve::<Reporter>(), Err(DiError::ParentReleased(_))));
    assert!(!child.is_registered::<Metrics>());
}

#[test]
fn test_optional_dependency_missing_with_live_parent() {
    struct Metrics;
    struct Reporter {
        metrics: Option<Arc<Metrics>>,
    }
    impl Injectable for Reporter {
        fn shape(shape: &mut ShapeBuilder<Self>) {
            shape
                .constructor("new", |args| Ok(Reporter { metrics: args.next_optional()? }))
                .optional::<Metrics>("metrics");
        }
    }

    let root = ContainerBuilder::new().build().unwrap();
    let child = root
        .create_scope_with(|b| {
            b.add_transient::<Reporter>()?;
            Ok(())
        })
        .unwrap();

    assert!(child.resolve::<Reporter>().unwrap().metrics.is_none());
}

#[test]
fn test_children_inherit_options_and_analyzer() {
    use ferrous_inject::{ContainerOptions, TypeAnalyzer};

    let analyzer = Arc::new(TypeAnalyzer::new());
    let mut builder = ContainerBuilder::new();
    builder
        .with_options(ContainerOptions::new().max_depth(12))
        .with_analyzer(analyzer.clone())
        .add_singleton::<Database>()
        .unwrap();
    let root = builder.build().unwrap();
    let child = root.create_scope().unwrap();

    assert_eq!(child.options().max_depth, 12);
    assert!(Arc::ptr_eq(child.analyzer(), &analyzer));
    child.resolve::<Database>().unwrap();
    assert!(analyzer.is_analyzed::<Database>());
}
