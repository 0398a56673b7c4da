#![no_main]

use ferrous_inject::{Binding, Container, ContainerBuilder, DiError, Lifetime, Resolver};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte picks the root registrations, one bit per service
    let mask = data[0];
    let mut builder = ContainerBuilder::new();
    if mask & 0b001 != 0 {
        builder.add_instance(TestService { id: 42 }).unwrap();
    }
    if mask & 0b010 != 0 {
        builder
            .bind(Binding::trait_instance(Arc::new(TestServiceImpl { value: 100 }) as Arc<dyn TestTrait>))
            .unwrap();
    }
    if mask & 0b100 != 0 {
        builder
            .add_factory(Lifetime::Scoped, |_| Ok(ScopedService { data: "scoped".to_string() }))
            .unwrap();
    }
    let root = builder.build().unwrap();

    // Remaining bytes drive a sequence of operations against a stack of scopes
    let mut scopes: Vec<Container> = vec![root.clone()];
    for op in &data[1..] {
        let current = scopes.last().cloned().unwrap();
        match op % 8 {
            0 => {
                let result = current.resolve::<TestService>();
                check(result.map(|s| s.id), mask & 0b001 != 0, &current);
            }
            1 => {
                let result = current.resolve::<dyn TestTrait>();
                check(result.map(|t| t.get_value()), mask & 0b010 != 0, &current);
            }
            2 => {
                let first = current.resolve::<ScopedService>();
                let second = current.resolve::<ScopedService>();
                if let (Ok(a), Ok(b)) = (&first, &second) {
                    assert!(Arc::ptr_eq(a, b));
                    assert_eq!(a.data, "scoped");
                }
                check(first.map(|_| ()), mask & 0b100 != 0, &current);
            }
            3 => {
                if let Ok(child) = current.create_scope() {
                    scopes.push(child);
                }
            }
            4 => {
                if scopes.len() > 1 {
                    if let Some(scope) = scopes.pop() {
                        scope.dispose();
                    }
                }
            }
            5 => {
                let all = current.resolve_all::<TestService>();
                if let Ok(all) = all {
                    assert_eq!(all.len(), usize::from(mask & 0b001 != 0));
                }
            }
            6 => {
                let registered = current.is_registered::<TestService>();
                assert_eq!(registered, mask & 0b001 != 0);
            }
            7 => {
                let _ = current.try_resolve::<ScopedService>();
            }
            _ => unreachable!(),
        }
    }

    root.dispose();
    assert!(scopes.iter().all(|s| s.is_disposed()));
});

/// Resolution succeeds exactly when the service was registered and the
/// scope is still live.
fn check<T>(result: Result<T, DiError>, registered: bool, scope: &Container) {
    match result {
        Ok(_) => assert!(registered && !scope.is_disposed()),
        Err(DiError::ScopeDisposed(_)) => assert!(scope.is_disposed()),
        Err(DiError::UnregisteredType { .. }) => assert!(!registered),
        Err(other) => panic!("unexpected error: {}", other),
    }
}

#[derive(Debug, Clone)]
struct TestService {
    id: u32,
}

#[derive(Debug, Clone)]
struct ScopedService {
    data: String,
}

trait TestTrait: Send + Sync {
    fn get_value(&self) -> i32;
}

#[derive(Debug)]
struct TestServiceImpl {
    value: i32,
}

impl TestTrait for TestServiceImpl {
    fn get_value(&self) -> i32 {
        self.value
    }
}
