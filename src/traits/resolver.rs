//! Resolver traits for service resolution.

use std::any::Any;
use std::sync::Arc;

use crate::container::ResolverContext;
use crate::error::DiResult;
use crate::generic::GenericContract;
use crate::key::ContractKey;
use crate::metadata::Injectable;
use crate::registration::unbox;
use crate::traits::Dispose;

/// Core resolver trait for object-safe service resolution.
///
/// Implemented by [`Container`](crate::Container) and [`ResolverContext`].
/// Values are returned type-erased; most code should use the generic
/// methods of [`Resolver`] instead.
pub trait ResolverCore: Send + Sync {
    /// Context bound to the scope this resolver resolves against.
    fn context(&self) -> ResolverContext<'_>;

    /// Resolves one value for `key`, stored as `Arc<C>` behind `dyn Any`.
    ///
    /// Uses the thread-local resolution stack for circular dependency
    /// detection.
    fn resolve_any(&self, key: &ContractKey) -> DiResult<Arc<dyn Any + Send + Sync>> {
        let ctx = self.context();
        ctx.scope.resolve(key)
    }

    /// Resolves every registration of `key`, ancestors' first.
    fn resolve_all_any(&self, key: &ContractKey) -> DiResult<Vec<Arc<dyn Any + Send + Sync>>> {
        let ctx = self.context();
        ctx.scope.resolve_all(key)
    }

    /// Whether `key` can be resolved without an `UnregisteredType` error
    /// at the top level.
    fn has_binding(&self, key: &ContractKey) -> bool {
        let ctx = self.context();
        ctx.scope.can_resolve(key).unwrap_or(false)
    }
}

/// High-level resolver interface with generic methods for type-safe service resolution.
///
/// Implemented for every [`ResolverCore`], so containers, scopes and factory
/// contexts all resolve the same way.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{injectable, Binding, ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// injectable!(ConsoleLogger);
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String { format!("LOG: {}", msg) }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.bind(Binding::<ConsoleLogger>::singleton().as_contract::<dyn Logger>(|l| l)).unwrap();
/// let container = builder.build().unwrap();
///
/// let logger = container.resolve::<dyn Logger>().unwrap();
/// assert_eq!(logger.log("ready"), "LOG: ready");
/// assert!(container.try_resolve::<String>().unwrap().is_none());
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves contract `C`: a concrete type or a trait object.
    fn resolve<C: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<C>> {
        let any = self.resolve_any(&ContractKey::of::<C>())?;
        unbox::<C>(&any)
    }

    /// Like [`resolve`](Self::resolve), but `Ok(None)` when `C` itself has no binding.
    ///
    /// Missing dependencies further down still fail.
    fn try_resolve<C: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<C>>> {
        match self.resolve::<C>() {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_unregistered(std::any::type_name::<C>()) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Resolves contract `C`, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics with the resolution error when `C` cannot be resolved.
    fn resolve_required<C: ?Sized + Send + Sync + 'static>(&self) -> Arc<C> {
        match self.resolve::<C>() {
            Ok(value) => value,
            Err(err) => panic!("failed to resolve {}: {}", std::any::type_name::<C>(), err),
        }
    }

    /// Resolves every registration of `C`.
    ///
    /// Registrations inherited from ancestor scopes come first (root first),
    /// each scope's in registration order. Empty when nothing is registered.
    fn resolve_all<C: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<C>>> {
        self.resolve_all_any(&ContractKey::of::<C>())?
            .iter()
            .map(unbox::<C>)
            .collect()
    }

    /// Resolves a closed generic, closing an open-generic binding of its
    /// family when `C` has no exact registration.
    fn resolve_generic<C: GenericContract>(&self) -> DiResult<Arc<C>> {
        let any = self.resolve_any(&ContractKey::generic::<C>())?;
        unbox::<C>(&any)
    }

    /// Builds `T` from its injection shape without a registration.
    ///
    /// Dependencies are resolved normally; a disposable `T` is disposed with
    /// the scope it was built in.
    fn construct<T: Injectable>(&self) -> DiResult<Arc<T>> {
        self.context().construct::<T>()
    }

    /// Injects `T`'s fields, properties and methods into an existing instance.
    fn inject_into<T: Injectable>(&self, target: &mut T) -> DiResult<()> {
        self.context().inject_into(target)
    }

    /// Whether `C` has a binding in this scope or an ancestor.
    fn is_registered<C: ?Sized + 'static>(&self) -> bool {
        self.has_binding(&ContractKey::of::<C>())
    }

    /// Attaches `service` to the current scope's disposal list.
    fn register_disposer<T: Dispose>(&self, service: Arc<T>) {
        self.context().register_disposer(service)
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
