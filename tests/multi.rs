use ferrous_inject::{injectable, Binding, ContainerBuilder, Lifetime, Resolver};
use std::sync::Arc;

trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;
}

struct P1;
struct P2;
struct P3;
injectable!(P1);
injectable!(P2);
injectable!(P3);

impl Plugin for P1 {
    fn name(&self) -> &'static str {
        "p1"
    }
}
impl Plugin for P2 {
    fn name(&self) -> &'static str {
        "p2"
    }
}
impl Plugin for P3 {
    fn name(&self) -> &'static str {
        "p3"
    }
}

fn names(plugins: &[Arc<dyn Plugin>]) -> Vec<&'static str> {
    plugins.iter().map(|p| p.name()).collect()
}

#[test]
fn test_last_registration_wins_and_all_are_kept() {
    let mut builder = ContainerBuilder::new();
    builder
        .bind(Binding::<P1>::singleton().as_contract::<dyn Plugin>(|p| p))
        .unwrap()
        .bind(Binding::<P2>::singleton().as_contract::<dyn Plugin>(|p| p))
        .unwrap();
    let container = builder.build().unwrap();

    assert_eq!(container.resolve::<dyn Plugin>().unwrap().name(), "p2");
    assert_eq!(names(&container.resolve_all::<dyn Plugin>().unwrap()), vec!["p1", "p2"]);
}

#[test]
fn test_resolve_all_shares_singletons_with_resolve() {
    let mut builder = ContainerBuilder::new();
    builder
        .bind(Binding::<P1>::singleton().as_contract::<dyn Plugin>(|p| p))
        .unwrap()
        .bind(Binding::<P2>::transient().as_contract::<dyn Plugin>(|p| p))
        .unwrap();
    let container = builder.build().unwrap();

    let first = container.resolve_all::<dyn Plugin>().unwrap();
    let second = container.resolve_all::<dyn Plugin>().unwrap();
    assert!(Arc::ptr_eq(&first[0], &second[0]));
    assert!(!Arc::ptr_eq(&first[1], &second[1]));
    assert!(!Arc::ptr_eq(&first[1], &container.resolve::<dyn Plugin>().unwrap()));
}

#[test]
fn test_resolve_all_empty_when_unregistered() {
    let container = ContainerBuilder::new().build().unwrap();
    assert!(container.resolve_all::<dyn Plugin>().unwrap().is_empty());
}

#[test]
fn test_resolve_all_spans_scope_chain_root_first() {
    let mut builder = ContainerBuilder::new();
    builder
        .bind(Binding::<P1>::singleton().as_contract::<dyn Plugin>(|p| p))
        .unwrap();
    let root = builder.build().unwrap();

    let child = root
        .create_scope_with(|b| {
            b.bind(Binding::<P2>::scoped().as_contract::<dyn Plugin>(|p| p))?;
            b.bind(Binding::<P3>::transient().as_contract::<dyn Plugin>(|p| p))?;
            Ok(())
        })
        .unwrap();

    assert_eq!(names(&child.resolve_all::<dyn Plugin>().unwrap()), vec!["p1", "p2", "p3"]);
    assert_eq!(names(&root.resolve_all::<dyn Plugin>().unwrap()), vec!["p1"]);
    assert_eq!(child.resolve::<dyn Plugin>().unwrap().name(), "p3");
}

#[test]
fn test_concrete_types_multi_bind() {
    let mut builder = ContainerBuilder::new();
    builder
        .add_instance(1u32)
        .unwrap()
        .add_factory(Lifetime::Transient, |_| Ok(2u32))
        .unwrap()
        .add_instance(3u32)
        .unwrap();
    let container = builder.build().unwrap();

    assert_eq!(*container.resolve::<u32>().unwrap(), 3);
    let all: Vec<u32> = container.resolve_all::<u32>().unwrap().iter().map(|v| **v).collect();
    assert_eq!(all, vec![1, 2, 3]);
}

#[test]
fn test_override_in_child_scope() {
    let mut builder = ContainerBuilder::new();
    builder
        .bind(Binding::<P1>::singleton().as_contract::<dyn Plugin>(|p| p))
        .unwrap();
    let root = builder.build().unwrap();
    let child = root
        .create_scope_with(|b| {
            b.bind(Binding::<P2>::singleton().as_contract::<dyn Plugin>(|p| p))?;
            Ok(())
        })
        .unwrap();
    let sibling = root.create_scope().unwrap();

    assert_eq!(child.resolve::<dyn Plugin>().unwrap().name(), "p2");
    assert_eq!(sibling.resolve::<dyn Plugin>().unwrap().name(), "p1");
    assert_eq!(root.resolve::<dyn Plugin>().unwrap().name(), "p1");
}
