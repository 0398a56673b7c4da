//! Disposal trait for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Implement this trait for services that need structured teardown (flushing
/// caches, closing connections). A type opts into container-managed disposal
/// by calling [`ShapeBuilder::disposable`](crate::ShapeBuilder::disposable) in
/// its injection shape, or through [`Binding::disposable`](crate::Binding::disposable)
/// for factory and instance bindings. Disposers run in reverse creation order
/// when the owning scope is disposed.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{Binding, ContainerBuilder, Dispose, Injectable, Resolver, ShapeBuilder};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// static FLUSHED: AtomicBool = AtomicBool::new(false);
///
/// struct Cache;
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         FLUSHED.store(true, Ordering::SeqCst);
///     }
/// }
///
/// impl Injectable for Cache {
///     fn shape(shape: &mut ShapeBuilder<Self>) {
///         shape.constructor("new", |_| Ok(Cache));
///         shape.disposable();
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.bind(Binding::<Cache>::scoped()).unwrap();
/// let root = builder.build().unwrap();
///
/// let scope = root.create_scope().unwrap();
/// scope.resolve::<Cache>().unwrap();
/// scope.dispose();
/// assert!(FLUSHED.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}
