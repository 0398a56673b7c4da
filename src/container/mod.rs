//! The container and its scope tree.
//!
//! A [`Container`] is a handle to one node of the scope tree. The root is
//! produced by [`ContainerBuilder::build`](crate::ContainerBuilder::build);
//! child scopes add their own registrations on top of what their ancestors
//! provide.

use std::fmt;
use std::sync::Arc;

use crate::builder::ContainerBuilder;
use crate::config::ContainerOptions;
use crate::descriptors::ServiceDescriptor;
use crate::error::DiResult;
use crate::metadata::TypeAnalyzer;
use crate::traits::ResolverCore;

mod context;
mod resolve;
mod scope;

pub use context::ResolverContext;
pub use scope::ScopeId;
pub(crate) use scope::{ScopeInner, ScopeSeed};

/// Handle to a scope of the dependency injection container.
///
/// Cloning is cheap and yields a handle to the same scope. A scope only
/// holds its parent weakly: keep the parent's handle alive for as long as
/// its children resolve through it.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{injectable, Binding, ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// struct Database;
/// injectable!(Database);
///
/// struct RequestContext { db: Arc<Database> }
/// injectable!(RequestContext { db: Database });
///
/// let mut builder = ContainerBuilder::new();
/// builder.bind(Binding::<Database>::singleton()).unwrap();
/// let root = builder.build().unwrap();
///
/// let request = root
///     .create_scope_with(|scope| {
///         scope.bind(Binding::<RequestContext>::scoped())?;
///         Ok(())
///     })
///     .unwrap();
///
/// let first = request.resolve::<RequestContext>().unwrap();
/// let second = request.resolve::<RequestContext>().unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
/// assert!(Arc::ptr_eq(&first.db, &root.resolve::<Database>().unwrap()));
/// assert!(!root.is_registered::<RequestContext>());
///
/// request.dispose();
/// root.dispose();
/// ```
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ScopeInner>,
}

impl Container {
    pub(crate) fn from_inner(inner: Arc<ScopeInner>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> ScopeId {
        self.inner.id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Number of ancestors; 0 for the root.
    pub fn depth(&self) -> usize {
        self.inner.depth
    }

    pub fn is_root(&self) -> bool {
        self.inner.parent_id.is_none()
    }

    /// Handle to the parent scope.
    ///
    /// `Ok(None)` for the root; `ParentReleased` once every handle to the
    /// parent has been dropped.
    pub fn parent(&self) -> DiResult<Option<Container>> {
        Ok(self.inner.parent()?.map(Container::from_inner))
    }

    pub fn parent_id(&self) -> Option<ScopeId> {
        self.inner.parent_id
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Creates an empty child scope.
    ///
    /// The child sees every registration of this scope and its ancestors.
    /// Scoped services get one instance per child.
    pub fn create_scope(&self) -> DiResult<Container> {
        ContainerBuilder::new().build_child(&self.inner)
    }

    /// Creates a child scope with registrations of its own.
    ///
    /// Registrations made in `configure` shadow inherited ones for
    /// `resolve` and are appended after them for `resolve_all`. Singletons
    /// registered here live and die with the child.
    pub fn create_scope_with<F>(&self, configure: F) -> DiResult<Container>
    where
        F: FnOnce(&mut ContainerBuilder) -> DiResult<()>,
    {
        let mut builder = ContainerBuilder::new();
        configure(&mut builder)?;
        builder.build_child(&self.inner)
    }

    /// Like [`create_scope_with`](Self::create_scope_with) with a name shown
    /// in logs, errors and resolution events.
    pub fn create_named_scope<F>(&self, name: impl Into<String>, configure: F) -> DiResult<Container>
    where
        F: FnOnce(&mut ContainerBuilder) -> DiResult<()>,
    {
        let mut builder = ContainerBuilder::named(name);
        configure(&mut builder)?;
        builder.build_child(&self.inner)
    }

    /// Disposes live child scopes, then this scope's instances in reverse
    /// creation order.
    ///
    /// Idempotent. Returns the number of disposers run by this scope itself.
    /// Afterwards every resolution through this scope fails with
    /// `ScopeDisposed`.
    pub fn dispose(&self) -> usize {
        self.inner.dispose()
    }

    /// Disposers waiting for [`dispose`](Self::dispose).
    pub fn pending_disposals(&self) -> usize {
        self.inner.pending_disposals()
    }

    /// Registrations held by this scope, in registration order, followed by
    /// the generic registrations closed so far.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        let registry = &self.inner.registry;
        registry
            .registrations()
            .iter()
            .cloned()
            .chain(registry.closed_registrations())
            .map(|r| ServiceDescriptor::from_registration(&r))
            .collect()
    }

    /// Open-generic families bound in this scope.
    pub fn open_generic_families(&self) -> Vec<&'static str> {
        self.inner
            .registry
            .open_registrations()
            .map(|open| open.family.name())
            .collect()
    }

    /// Child scopes that are still alive.
    pub fn live_children(&self) -> Vec<Container> {
        self.inner
            .live_children()
            .into_iter()
            .map(Container::from_inner)
            .collect()
    }

    pub fn analyzer(&self) -> &Arc<TypeAnalyzer> {
        &self.inner.analyzer
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.inner.options
    }

    /// Multi-line dump of this scope and its registrations.
    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} depth={} disposed={} observers={}",
            self.inner.label(),
            self.depth(),
            self.is_disposed(),
            self.inner.observers.len()
        );
        for descriptor in self.descriptors() {
            let _ = writeln!(
                out,
                "  {:?} {} -> [{}] {:?}{}",
                descriptor.lifetime,
                descriptor.implementation,
                descriptor.contracts.join(", "),
                descriptor.provider,
                if descriptor.eager { " eager" } else { "" }
            );
        }
        for family in self.open_generic_families() {
            let _ = writeln!(out, "  open {}", family);
        }
        out
    }
}

impl ResolverCore for Container {
    fn context(&self) -> ResolverContext<'_> {
        ResolverContext::new(&self.inner)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("depth", &self.inner.depth)
            .field("registrations", &self.inner.registry.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
