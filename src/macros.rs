//! Declarative helpers.

/// Implements [`Injectable`](crate::Injectable) for the common case of a
/// struct built from one constructor whose parameters are its fields.
///
/// Each field is declared with the contract it is resolved as and must have
/// type `Arc<Contract>`. Unit structs take no fields.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{injectable, Binding, ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync { fn now(&self) -> u64; }
///
/// struct FixedClock;
/// injectable!(FixedClock);
/// impl Clock for FixedClock { fn now(&self) -> u64 { 42 } }
///
/// struct Scheduler {
///     clock: Arc<dyn Clock>,
///     name: Arc<String>,
/// }
/// injectable!(Scheduler { clock: dyn Clock, name: String });
///
/// let mut builder = ContainerBuilder::new();
/// builder
///     .bind(Binding::<FixedClock>::singleton().as_contract::<dyn Clock>(|c| c)).unwrap()
///     .add_instance(String::from("nightly")).unwrap()
///     .add_transient::<Scheduler>().unwrap();
/// let container = builder.build().unwrap();
///
/// let scheduler = container.resolve::<Scheduler>().unwrap();
/// assert_eq!(scheduler.clock.now(), 42);
/// assert_eq!(scheduler.name.as_str(), "nightly");
/// ```
#[macro_export]
macro_rules! injectable {
    ($ty:ident) => {
        impl $crate::Injectable for $ty {
            fn shape(shape: &mut $crate::ShapeBuilder<Self>) {
                shape.constructor("new", |_| Ok($ty));
            }
        }
    };
    ($ty:ident { $($field:ident : $contract:ty),* $(,)? }) => {
        impl $crate::Injectable for $ty {
            fn shape(shape: &mut $crate::ShapeBuilder<Self>) {
                shape
                    .constructor("new", |args| {
                        Ok($ty {
                            $($field: args.next::<$contract>()?,)*
                        })
                    })
                    $(.param::<$contract>(stringify!($field)))*;
            }
        }
    };
}
