use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ferrous_inject::*;
use std::sync::Arc;

// ===== Micro Benchmarks =====

fn bench_singleton_hit(c: &mut Criterion) {
    let mut builder = ContainerBuilder::new();
    builder.add_instance(42u64).unwrap();
    let container = builder.build().unwrap();

    // Prime the singleton
    let _ = container.resolve::<u64>().unwrap();

    c.bench_function("singleton_hit_u64", |b| {
        b.iter(|| {
            let v = container.resolve::<u64>().unwrap();
            black_box(v);
        })
    });
}

fn bench_singleton_cold(c: &mut Criterion) {
    struct ExpensiveToCreate {
        data: Vec<u64>,
    }

    c.bench_function("singleton_cold_expensive", |b| {
        b.iter_batched(
            || {
                let mut builder = ContainerBuilder::new();
                builder
                    .add_factory(Lifetime::Singleton, |_| {
                        Ok(ExpensiveToCreate {
                            data: (0..1000).collect(),
                        })
                    })
                    .unwrap();
                builder.build().unwrap()
            },
            |container| {
                let v = container.resolve::<ExpensiveToCreate>().unwrap();
                black_box(v.data.len());
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_scoped_vs_transient(c: &mut Criterion) {
    struct Service {
        data: [u8; 64],
    }

    let mut group = c.benchmark_group("scoped_vs_transient");

    let mut scoped = ContainerBuilder::new();
    scoped
        .add_factory(Lifetime::Scoped, |_| Ok(Service { data: [0; 64] }))
        .unwrap();
    let root = scoped.build().unwrap();
    let scope = root.create_scope().unwrap();

    group.bench_function("scoped_hit", |b| {
        b.iter(|| {
            let v = scope.resolve::<Service>().unwrap();
            black_box(&v.data);
        })
    });

    let mut transient = ContainerBuilder::new();
    transient
        .add_factory(Lifetime::Transient, |_| Ok(Service { data: [0; 64] }))
        .unwrap();
    let container = transient.build().unwrap();

    group.bench_function("transient", |b| {
        b.iter(|| {
            let v = container.resolve::<Service>().unwrap();
            black_box(&v.data);
        })
    });

    group.finish();
}

// ===== Graph Benchmarks =====

struct Config;
injectable!(Config);

struct Database {
    _config: Arc<Config>,
}
injectable!(Database { _config: Config });

struct Cache {
    _config: Arc<Config>,
}
injectable!(Cache { _config: Config });

struct UserRepository {
    _db: Arc<Database>,
    _cache: Arc<Cache>,
}
injectable!(UserRepository { _db: Database, _cache: Cache });

struct UserService {
    _users: Arc<UserRepository>,
    _config: Arc<Config>,
}
injectable!(UserService { _users: UserRepository, _config: Config });

fn graph_container(lifetime: Lifetime) -> Container {
    let mut builder = ContainerBuilder::new();
    builder
        .add_singleton::<Config>()
        .unwrap()
        .bind(Binding::<Database>::of_type(lifetime))
        .unwrap()
        .bind(Binding::<Cache>::of_type(lifetime))
        .unwrap()
        .bind(Binding::<UserRepository>::of_type(lifetime))
        .unwrap()
        .add_transient::<UserService>()
        .unwrap();
    builder.build().unwrap()
}

fn bench_dependency_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("dependency_graph");

    for lifetime in [Lifetime::Singleton, Lifetime::Scoped, Lifetime::Transient] {
        let root = graph_container(lifetime);
        let scope = root.create_scope().unwrap();
        let _ = scope.resolve::<UserService>().unwrap();

        group.bench_with_input(BenchmarkId::new("user_service", lifetime), &scope, |b, scope| {
            b.iter(|| {
                let v = scope.resolve::<UserService>().unwrap();
                black_box(v);
            })
        });
    }

    group.finish();
}

fn bench_trait_resolution(c: &mut Criterion) {
    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }
    struct FixedClock;
    injectable!(FixedClock);
    impl Clock for FixedClock {
        fn now(&self) -> u64 {
            7
        }
    }

    let mut builder = ContainerBuilder::new();
    builder
        .bind(Binding::<FixedClock>::singleton().as_contract::<dyn Clock>(|c| c))
        .unwrap();
    let container = builder.build().unwrap();

    c.bench_function("trait_singleton_hit", |b| {
        b.iter(|| {
            let clock = container.resolve::<dyn Clock>().unwrap();
            black_box(clock.now());
        })
    });
}

fn bench_resolve_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_all");

    for count in [1usize, 8, 32] {
        let mut builder = ContainerBuilder::new();
        for i in 0..count {
            builder.add_instance(i as u32).unwrap();
        }
        let container = builder.build().unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(count), &container, |b, container| {
            b.iter(|| {
                let all = container.resolve_all::<u32>().unwrap();
                black_box(all.len());
            })
        });
    }

    group.finish();
}

// ===== Scope Benchmarks =====

fn bench_scope_lifecycle(c: &mut Criterion) {
    let root = graph_container(Lifetime::Scoped);

    c.bench_function("scope_create_resolve_dispose", |b| {
        b.iter(|| {
            let scope = root.create_scope().unwrap();
            let v = scope.resolve::<UserService>().unwrap();
            black_box(v);
            scope.dispose();
        })
    });
}

fn bench_analysis(c: &mut Criterion) {
    c.bench_function("analyze_cold", |b| {
        b.iter_batched(
            TypeAnalyzer::new,
            |analyzer| {
                let info = analyzer.analyze::<UserService>().unwrap();
                black_box(info);
            },
            criterion::BatchSize::SmallInput,
        )
    });

    let analyzer = TypeAnalyzer::new();
    let _ = analyzer.analyze::<UserService>().unwrap();
    c.bench_function("analyze_cached", |b| {
        b.iter(|| {
            let info = analyzer.analyze::<UserService>().unwrap();
            black_box(info);
        })
    });
}

criterion_group!(
    benches,
    bench_singleton_hit,
    bench_singleton_cold,
    bench_scoped_vs_transient,
    bench_dependency_graph,
    bench_trait_resolution,
    bench_resolve_all,
    bench_scope_lifecycle,
    bench_analysis
);
criterion_main!(benches);
