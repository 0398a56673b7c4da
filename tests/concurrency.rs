use ferrous_inject::{Binding, ContainerBuilder, Injectable, Lifetime, Resolver, ShapeBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const THREADS: usize = 16;

static SLOW_BUILDS: AtomicUsize = AtomicUsize::new(0);

struct SlowSingleton {
    id: usize,
}

impl Injectable for SlowSingleton {
    fn shape(shape: &mut ShapeBuilder<Self>) {
        shape.constructor("new", |_| {
            thread::sleep(Duration::from_millis(25));
            Ok(SlowSingleton {
                id: SLOW_BUILDS.fetch_add(1, Ordering::SeqCst),
            })
        });
    }
}

#[test]
fn test_concurrent_singleton_resolution_builds_once() {
    let mut builder = ContainerBuilder::new();
    builder.add_singleton::<SlowSingleton>().unwrap();
    let container = builder.build().unwrap();
    let barrier = Barrier::new(THREADS);

    let resolved = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|_| {
                    barrier.wait();
                    container.resolve::<SlowSingleton>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    })
    .unwrap();

    assert_eq!(SLOW_BUILDS.load(Ordering::SeqCst), 1);
    let first = &resolved[0];
    assert!(resolved.iter().all(|r| Arc::ptr_eq(r, first)));
    assert_eq!(first.id, 0);
}

#[test]
fn test_concurrent_factory_singleton_from_child_scopes() {
    struct Pool;
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = builds.clone();

    let mut builder = ContainerBuilder::new();
    builder
        .add_factory(Lifetime::Singleton, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(10));
            Ok(Pool)
        })
        .unwrap();
    let root = builder.build().unwrap();
    let barrier = Barrier::new(THREADS);

    let pools = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let root = &root;
                let barrier = &barrier;
                s.spawn(move |_| {
                    let scope = root.create_scope().unwrap();
                    barrier.wait();
                    let pool = scope.resolve::<Pool>().unwrap();
                    scope.dispose();
                    pool
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    })
    .unwrap();

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(pools.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[test]
fn test_scoped_instances_per_thread_scope() {
    struct Request;
    let mut builder = ContainerBuilder::new();
    builder
        .bind(Binding::factory(Lifetime::Scoped, |_| Ok(Request)))
        .unwrap();
    let root = builder.build().unwrap();

    let requests = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let root = &root;
                s.spawn(move |_| {
                    let scope = root.create_scope().unwrap();
                    let a = scope.resolve::<Request>().unwrap();
                    let b = scope.resolve::<Request>().unwrap();
                    assert!(Arc::ptr_eq(&a, &b));
                    scope.dispose();
                    a
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    })
    .unwrap();

    for (i, a) in requests.iter().enumerate() {
        for b in &requests[i + 1..] {
            assert!(!Arc::ptr_eq(a, b));
        }
    }
}

#[test]
fn test_concurrent_open_generic_closing() {
    use ferrous_inject::{GenericContract, OpenGenericBinding};
    use std::marker::PhantomData;

    struct StoreFamily;
    struct Store<T>(PhantomData<fn() -> T>);
    impl<T: 'static> Injectable for Store<T> {
        fn shape(shape: &mut ShapeBuilder<Self>) {
            shape.constructor("new", |_| Ok(Store(PhantomData)));
        }
    }
    impl<T: 'static> GenericContract for Store<T> {
        type Family = StoreFamily;
    }

    let mut builder = ContainerBuilder::new();
    builder
        .bind_open(OpenGenericBinding::new::<StoreFamily>(Lifetime::Singleton))
        .unwrap();
    let container = builder.build().unwrap();
    let barrier = Barrier::new(THREADS);

    let stores = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|_| {
                    barrier.wait();
                    container.resolve_generic::<Store<String>>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    })
    .unwrap();

    assert!(stores.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(container.descriptors().iter().filter(|d| d.is_closed_generic()).count(), 1);
}
