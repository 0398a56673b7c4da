//! Container builder.
//!
//! This module contains the ContainerBuilder type used to collect
//! registrations, validate them and build the root container or a child
//! scope.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::config::ContainerOptions;
use crate::container::{Container, ResolverContext, ScopeInner, ScopeSeed};
use crate::error::{DiError, DiResult};
use crate::generic::{OpenGenericBinding, OpenRegistration};
use crate::lifetime::Lifetime;
use crate::metadata::{Injectable, TypeAnalyzer};
use crate::observer::{DiObserver, Observers};
use crate::registration::{Binding, Registration, Registry};

mod module_system;

pub use module_system::ContainerModule;

type OnBuilt = Box<dyn FnOnce(&Container) -> DiResult<()> + Send>;

/// Collects registrations and builds a [`Container`].
///
/// The same builder type configures child scopes in
/// [`Container::create_scope_with`]. Building freezes the builder: later
/// registrations and builds fail with `BuilderFrozen`.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{injectable, Binding, ContainerBuilder, DiError, Resolver};
/// use std::sync::Arc;
///
/// struct Config;
/// injectable!(Config);
///
/// struct Service { config: Arc<Config> }
/// injectable!(Service { config: Config });
///
/// let mut builder = ContainerBuilder::new();
/// builder
///     .bind(Binding::<Config>::singleton())?
///     .bind(Binding::<Service>::transient())?;
///
/// let container = builder.build()?;
/// let service = container.resolve::<Service>()?;
/// assert!(Arc::ptr_eq(&service.config, &container.resolve::<Config>()?));
///
/// assert_eq!(builder.bind(Binding::<Config>::scoped()).err(), Some(DiError::BuilderFrozen));
/// # Ok::<(), DiError>(())
/// ```
pub struct ContainerBuilder {
    name: Option<String>,
    registrations: Vec<Registration>,
    open: Vec<OpenRegistration>,
    observers: Observers,
    options: Option<ContainerOptions>,
    analyzer: Option<Arc<TypeAnalyzer>>,
    on_built: Vec<OnBuilt>,
    frozen: bool,
}

impl ContainerBuilder {
    /// Creates a new empty builder.
    pub fn new() -> Self {
        Self {
            name: None,
            registrations: Vec::new(),
            open: Vec::new(),
            observers: Observers::default(),
            options: None,
            analyzer: None,
            on_built: Vec::new(),
            frozen: false,
        }
    }

    /// Creates a builder whose scope carries `name` in logs and errors.
    pub fn named(name: impl Into<String>) -> Self {
        let mut builder = Self::new();
        builder.name = Some(name.into());
        builder
    }

    /// Replaces the options; child scopes inherit their parent's by default.
    pub fn with_options(&mut self, options: ContainerOptions) -> &mut Self {
        self.options = Some(options);
        self
    }

    /// Uses an isolated analyzer instead of [`TypeAnalyzer::global`].
    pub fn with_analyzer(&mut self, analyzer: Arc<TypeAnalyzer>) -> &mut Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Attaches an observer. Child scopes report to their parent's observers too.
    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    // ----- Registrations -----

    /// Adds a registration.
    ///
    /// Every binding of a contract is kept: `resolve` uses the last one,
    /// `resolve_all` returns all of them in registration order.
    pub fn bind<I: Send + Sync + 'static>(&mut self, binding: Binding<I>) -> DiResult<&mut Self> {
        self.ensure_open()?;
        self.registrations.push(binding.into_registration());
        Ok(self)
    }

    /// Adds an open-generic registration. A later binding of the same family
    /// replaces an earlier one.
    pub fn bind_open(&mut self, binding: OpenGenericBinding) -> DiResult<&mut Self> {
        self.ensure_open()?;
        self.open.push(binding.into());
        Ok(self)
    }

    /// Shorthand for `bind(Binding::<I>::singleton())`.
    pub fn add_singleton<I: Injectable>(&mut self) -> DiResult<&mut Self> {
        self.bind(Binding::<I>::singleton())
    }

    /// Shorthand for `bind(Binding::<I>::scoped())`.
    pub fn add_scoped<I: Injectable>(&mut self) -> DiResult<&mut Self> {
        self.bind(Binding::<I>::scoped())
    }

    /// Shorthand for `bind(Binding::<I>::transient())`.
    pub fn add_transient<I: Injectable>(&mut self) -> DiResult<&mut Self> {
        self.bind(Binding::<I>::transient())
    }

    /// Registers a pre-built instance.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_inject::{ContainerBuilder, Resolver};
    ///
    /// struct Settings { retries: u32 }
    ///
    /// let mut builder = ContainerBuilder::new();
    /// builder.add_instance(Settings { retries: 3 }).unwrap();
    /// let container = builder.build().unwrap();
    /// assert_eq!(container.resolve::<Settings>().unwrap().retries, 3);
    /// ```
    pub fn add_instance<I: Send + Sync + 'static>(&mut self, value: I) -> DiResult<&mut Self> {
        self.bind(Binding::instance(value))
    }

    /// Registers a factory.
    pub fn add_factory<I, F>(&mut self, lifetime: Lifetime, factory: F) -> DiResult<&mut Self>
    where
        I: Send + Sync + 'static,
        F: for<'a> Fn(&ResolverContext<'a>) -> DiResult<I> + Send + Sync + 'static,
    {
        self.bind(Binding::factory(lifetime, factory))
    }

    /// Lets `module` add its registrations.
    pub fn add_module<M: ContainerModule>(&mut self, module: M) -> DiResult<&mut Self> {
        self.ensure_open()?;
        module.register(self)?;
        Ok(self)
    }

    /// Runs `callback` once, right after the container is built and its
    /// eager singletons are resolved. An error fails the build.
    pub fn on_built<F>(&mut self, callback: F) -> DiResult<&mut Self>
    where
        F: FnOnce(&Container) -> DiResult<()> + Send + 'static,
    {
        self.ensure_open()?;
        self.on_built.push(Box::new(callback));
        Ok(self)
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Number of registrations added so far, open generics excluded.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty() && self.open.is_empty()
    }

    fn ensure_open(&self) -> DiResult<()> {
        if self.frozen {
            Err(DiError::BuilderFrozen)
        } else {
            Ok(())
        }
    }

    // ----- Build -----

    /// Freezes the builder and builds the root container.
    ///
    /// With [`validate_on_build`](ContainerOptions::validate_on_build) every
    /// type registration is analyzed and the dependencies of eager
    /// registrations are checked; with
    /// [`eager_singletons`](ContainerOptions::eager_singletons) eager
    /// singletons are resolved before this returns.
    pub fn build(&mut self) -> DiResult<Container> {
        self.finish(None)
    }

    pub(crate) fn build_child(&mut self, parent: &Arc<ScopeInner>) -> DiResult<Container> {
        self.finish(Some(parent))
    }

    fn finish(&mut self, parent: Option<&Arc<ScopeInner>>) -> DiResult<Container> {
        self.ensure_open()?;
        self.frozen = true;

        let mut registry = Registry::new();
        for registration in self.registrations.drain(..) {
            registry.insert(registration);
        }
        for open in self.open.drain(..) {
            registry.insert_open(open);
        }

        let options = match (self.options.take(), parent) {
            (Some(options), _) => options,
            (None, Some(parent)) => parent.options.clone(),
            (None, None) => ContainerOptions::default(),
        };
        let analyzer = match (self.analyzer.take(), parent) {
            (Some(analyzer), _) => analyzer,
            (None, Some(parent)) => parent.analyzer.clone(),
            (None, None) => TypeAnalyzer::global(),
        };
        let mut observers = parent.map(|p| p.observers.clone()).unwrap_or_default();
        observers.extend(std::mem::take(&mut self.observers));

        let seed = ScopeSeed {
            name: self.name.take(),
            registry,
            analyzer,
            observers,
            options,
        };
        let inner = match parent {
            Some(parent) => ScopeInner::new_child(parent, seed)?,
            None => ScopeInner::new_root(seed),
        };

        inner.observers.scope_created(inner.id, inner.parent_id);

        let container = Container::from_inner(inner);
        let callbacks = std::mem::take(&mut self.on_built);
        match start(&container, callbacks) {
            Ok(()) => Ok(container),
            Err(err) => {
                tracing::debug!(scope = %container.id(), error = %err, "build failed; disposing scope");
                container.dispose();
                Err(err)
            }
        }
    }
}

/// Validates, warms eager singletons and runs `on_built` callbacks.
fn start(container: &Container, callbacks: Vec<OnBuilt>) -> DiResult<()> {
    let inner = &container.inner;
    if inner.options.validate_on_build {
        validate(inner)?;
    }

    if inner.options.eager_singletons {
        for registration in inner.registry.registrations().iter().filter(|r| r.eager) {
            if registration.lifetime != Lifetime::Singleton {
                tracing::warn!(
                    implementation = registration.implementation.name(),
                    lifetime = %registration.lifetime,
                    "eager() only applies to singletons; ignored"
                );
                continue;
            }
            inner.warm(registration)?;
        }
    }

    for callback in callbacks {
        callback(container)?;
    }
    Ok(())
}

/// Analyzes every type registration and checks that the required
/// dependencies of eager registrations have a reachable binding.
fn validate(scope: &Arc<ScopeInner>) -> DiResult<()> {
    for registration in scope.registry.registrations() {
        if let Some(describe) = registration.describe {
            describe(&scope.analyzer)?;
        }
    }

    let mut visited = HashSet::new();
    for registration in scope.registry.registrations().iter().filter(|r| r.eager) {
        let mut chain = vec![registration.implementation.name()];
        check_reachable(scope, registration, &mut visited, &mut chain)?;
    }
    Ok(())
}

fn check_reachable(
    scope: &Arc<ScopeInner>,
    registration: &Registration,
    visited: &mut HashSet<u64>,
    chain: &mut Vec<&'static str>,
) -> DiResult<()> {
    if !visited.insert(registration.id) {
        return Ok(());
    }
    // factories and instances have no static dependency information
    let Some(describe) = registration.describe else {
        return Ok(());
    };

    let info = describe(&scope.analyzer)?;
    for param in info.dependencies() {
        if !param.is_required() || registration.is_overridden(param.name()) || param.contract().is_constructible() {
            continue;
        }
        match scope.lookup(param.contract())? {
            Some((_, dependency)) => {
                chain.push(dependency.implementation.name());
                check_reachable(scope, &dependency, visited, chain)?;
                chain.pop();
            }
            None => {
                return Err(DiError::UnregisteredType {
                    contract: param.contract().name(),
                    chain: chain.clone(),
                })
            }
        }
    }
    Ok(())
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("name", &self.name)
            .field("registrations", &self.registrations)
            .field("open", &self.open)
            .field("observers", &self.observers.len())
            .field("frozen", &self.frozen)
            .finish()
    }
}
