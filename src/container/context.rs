//! Resolver context for dependency injection.
//!
//! This module contains the ResolverContext type which provides
//! the interface for factory functions to resolve dependencies.

use std::any::Any;
use std::sync::Arc;

use super::scope::{ScopeId, ScopeInner};
use crate::error::DiResult;
use crate::internal::StackGuard;
use crate::key::{ContractKey, Fallback, TypeKey};
use crate::metadata::{Injectable, ParamInfo, TypeAnalyzer, TypeMetadata};
use crate::registration::{boxed, AnyArc, Overrides};
use crate::traits::{Dispose, ResolverCore};

/// Context passed to factory functions for resolving dependencies.
///
/// A context is bound to one scope: everything resolved through it is
/// resolved as if requested from that scope. Singleton factories receive the
/// context of the scope that owns the singleton.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{Binding, ContainerBuilder, Lifetime, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut builder = ContainerBuilder::new();
/// builder.bind(Binding::instance(Database { url: "postgres://localhost".into() })).unwrap();
/// builder.bind(Binding::factory(Lifetime::Transient, |ctx| {
///     Ok(UserService { db: ctx.resolve::<Database>()? })
/// })).unwrap();
///
/// let container = builder.build().unwrap();
/// let users = container.resolve::<UserService>().unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
#[derive(Clone, Copy)]
pub struct ResolverContext<'a> {
    pub(crate) scope: &'a Arc<ScopeInner>,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(scope: &'a Arc<ScopeInner>) -> Self {
        Self { scope }
    }

    /// Scope this context resolves against.
    pub fn scope_id(&self) -> ScopeId {
        self.scope.id
    }

    pub fn scope_name(&self) -> Option<&'a str> {
        self.scope.name.as_deref()
    }

    pub(crate) fn analyzer(&self) -> &'a TypeAnalyzer {
        &self.scope.analyzer
    }

    /// Attaches `service` to this scope's disposal list.
    pub fn register_disposer<T: Dispose>(&self, service: Arc<T>) {
        self.scope.track(
            TypeKey::of::<T>(),
            Some(Box::new(move || service.dispose())),
        );
    }

    /// Builds `T` from its metadata, taking named parameters from
    /// `overrides` before resolving them.
    pub(crate) fn instantiate<T: Injectable>(&self, metadata: &TypeMetadata<T>, overrides: &Overrides) -> DiResult<T> {
        metadata.instantiate(&mut |param: &ParamInfo| self.supply(param, overrides))
    }

    /// Builds an unregistered `T`; the owning scope disposes it if `T` is disposable.
    pub(crate) fn construct<T: Injectable>(&self) -> DiResult<Arc<T>> {
        self.scope.ensure_live()?;
        let _frame = StackGuard::enter(TypeKey::of::<T>(), self.scope.options.max_depth)?;
        self.construct_unguarded::<T>()
    }

    fn construct_unguarded<T: Injectable>(&self) -> DiResult<Arc<T>> {
        let metadata = self.analyzer().analyze::<T>()?;
        let instance = Arc::new(self.instantiate(&metadata, &Overrides::default())?);
        if let Some(dispose) = metadata.disposer() {
            let target = instance.clone();
            self.scope
                .track(TypeKey::of::<T>(), Some(Box::new(move || dispose(&target))));
        }
        Ok(instance)
    }

    /// Runs member injection on an instance the container did not build.
    pub(crate) fn inject_into<T: Injectable>(&self, target: &mut T) -> DiResult<()> {
        self.scope.ensure_live()?;
        let metadata = self.analyzer().analyze::<T>()?;
        let overrides = Overrides::default();
        metadata.inject(target, &mut |param: &ParamInfo| self.supply(param, &overrides))
    }

    fn supply(&self, param: &ParamInfo, overrides: &Overrides) -> DiResult<Option<AnyArc>> {
        if let Some(value) = overrides.get(param.name()) {
            return value.produce(self).map(Some);
        }
        if param.is_required() || self.scope.can_resolve(param.contract())? {
            self.scope.resolve(param.contract()).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl ResolverCore for ResolverContext<'_> {
    fn context(&self) -> ResolverContext<'_> {
        *self
    }
}

impl std::fmt::Debug for ResolverContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverContext").field("scope", &self.scope.id).finish()
    }
}

impl ContractKey {
    /// Key for `T` that builds `T` from its injection shape when no binding exists.
    pub fn constructible<T: Injectable>() -> Self {
        ContractKey::with_fallback(TypeKey::of::<T>(), Fallback::Construct(construct_contract::<T>))
    }
}

fn construct_contract<T: Injectable>(ctx: &ResolverContext<'_>) -> DiResult<Arc<dyn Any + Send + Sync>> {
    ctx.construct_unguarded::<T>().map(boxed)
}
