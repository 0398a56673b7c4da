//! Service registration types.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

use crate::container::ResolverContext;
use crate::error::{DiError, DiResult};
use crate::generic::OpenRegistration;
use crate::internal::Disposer;
use crate::key::{ContractKey, Fallback, TypeKey};
use crate::lifetime::Lifetime;
use crate::metadata::{Injectable, TypeAnalyzer, TypeInfo};
use crate::traits::Dispose;
use crate::FastMap;

// Type-erased Arc for storage
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// Reads an `Arc<C>` stored as a contract value.
///
/// Contract values are stored boxed (`Arc<Arc<C>>` erased to `AnyArc`) so
/// that unsized trait-object contracts survive type erasure.
pub(crate) fn unbox<C: ?Sized + Send + Sync + 'static>(value: &AnyArc) -> DiResult<Arc<C>> {
    value
        .downcast_ref::<Arc<C>>()
        .cloned()
        .ok_or(DiError::TypeMismatch(std::any::type_name::<C>()))
}

/// Boxes an `Arc<C>` as a contract value.
pub(crate) fn boxed<C: ?Sized + Send + Sync + 'static>(value: Arc<C>) -> AnyArc {
    Arc::new(value)
}

/// Result of running a registration's constructor.
pub(crate) struct Built {
    /// The implementation instance, `Arc<I>` erased.
    pub(crate) instance: AnyArc,
    pub(crate) dispose: Option<Disposer>,
}

pub(crate) type Ctor = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<Built> + Send + Sync>;
pub(crate) type Caster = Arc<dyn Fn(&AnyArc) -> DiResult<AnyArc> + Send + Sync>;
pub(crate) type Describe = fn(&TypeAnalyzer) -> DiResult<Arc<TypeInfo>>;
type OverrideFactory = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

/// How a registration produces instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProviderKind {
    /// Built from the implementation type's injection shape.
    Type,
    /// Built by a user factory.
    Factory,
    /// A pre-built instance.
    Instance,
    /// Closed on demand from an open-generic registration.
    ClosedGeneric,
}

/// One contract a registration answers for.
pub(crate) struct Contract {
    pub(crate) key: ContractKey,
    pub(crate) cast: Caster,
}

/// Value supplied for a named parameter instead of normal resolution.
pub(crate) enum Override {
    Value(AnyArc),
    Factory(OverrideFactory),
}

impl Override {
    pub(crate) fn produce(&self, ctx: &ResolverContext<'_>) -> DiResult<AnyArc> {
        match self {
            Override::Value(value) => Ok(value.clone()),
            Override::Factory(factory) => factory(ctx),
        }
    }
}

pub(crate) type Overrides = FastMap<&'static str, Override>;

static NEXT_REGISTRATION_ID: AtomicU64 = AtomicU64::new(1);

/// Service registration with lifetime and constructor
pub(crate) struct Registration {
    pub(crate) id: u64,
    pub(crate) lifetime: Lifetime,
    pub(crate) implementation: TypeKey,
    pub(crate) provider: ProviderKind,
    /// Open-generic family this registration was closed from
    pub(crate) family: Option<TypeKey>,
    pub(crate) contracts: SmallVec<[Contract; 2]>,
    pub(crate) ctor: Ctor,
    /// Static dependency information, for type providers only
    pub(crate) describe: Option<Describe>,
    pub(crate) overrides: Arc<Overrides>,
    pub(crate) eager: bool,
    /// Singleton slot; the lock is held while the instance is constructed
    pub(crate) singleton: Mutex<Option<AnyArc>>,
}

impl Registration {
    /// Converts the cached implementation instance to the value stored for `key`.
    pub(crate) fn cast(&self, key: &ContractKey, instance: &AnyArc) -> DiResult<AnyArc> {
        self.contracts
            .iter()
            .find(|c| c.key == *key)
            .ok_or(DiError::TypeMismatch(key.name()))
            .and_then(|c| (c.cast)(instance))
    }

    pub(crate) fn contract_names(&self) -> Vec<&'static str> {
        self.contracts.iter().map(|c| c.key.name()).collect()
    }

    pub(crate) fn is_overridden(&self, name: &str) -> bool {
        self.overrides.contains_key(name)
    }

    pub(crate) fn closed_from(mut self, family: TypeKey) -> Self {
        self.provider = ProviderKind::ClosedGeneric;
        self.family = Some(family);
        self
    }

    pub(crate) fn take_singleton(&self) -> Option<AnyArc> {
        self.singleton.lock().take()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("implementation", &self.implementation)
            .field("contracts", &self.contract_names())
            .field("lifetime", &self.lifetime)
            .field("provider", &self.provider)
            .field("eager", &self.eager)
            .finish()
    }
}

enum Make<I> {
    Type(fn(Arc<Overrides>, Option<fn(&I)>) -> Ctor, Describe),
    Factory(Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<I> + Send + Sync>),
    Instance(Arc<I>),
}

/// A registration in the making.
///
/// `I` is the implementation type. A binding answers for `I` itself unless
/// contracts are added with [`as_contract`](Binding::as_contract); one
/// registration may answer for several contracts and then shares one
/// instance between them.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{injectable, Binding, ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// trait Reader: Send + Sync { fn read(&self) -> u8; }
/// trait Writer: Send + Sync {}
///
/// struct File;
/// injectable!(File);
/// impl Reader for File { fn read(&self) -> u8 { 7 } }
/// impl Writer for File {}
///
/// let mut builder = ContainerBuilder::new();
/// builder.bind(
///     Binding::<File>::singleton()
///         .as_self()
///         .as_contract::<dyn Reader>(|f| f)
///         .as_contract::<dyn Writer>(|f| f),
/// ).unwrap();
/// let container = builder.build().unwrap();
///
/// let reader = container.resolve::<dyn Reader>().unwrap();
/// let file = container.resolve::<File>().unwrap();
/// assert_eq!(reader.read(), 7);
/// assert!(std::ptr::eq(Arc::as_ptr(&reader) as *const u8, Arc::as_ptr(&file) as *const u8));
/// ```
pub struct Binding<I> {
    lifetime: Lifetime,
    make: Make<I>,
    contracts: SmallVec<[Contract; 2]>,
    overrides: Overrides,
    disposer: Option<fn(&I)>,
    eager: bool,
}

impl<I: Injectable> Binding<I> {
    /// Type provider with one instance per owning scope.
    pub fn singleton() -> Self {
        Self::of_type(Lifetime::Singleton)
    }

    /// Type provider with one instance per scope.
    pub fn scoped() -> Self {
        Self::of_type(Lifetime::Scoped)
    }

    /// Type provider with a new instance per resolution.
    pub fn transient() -> Self {
        Self::of_type(Lifetime::Transient)
    }

    /// Type provider with an explicit lifetime.
    pub fn of_type(lifetime: Lifetime) -> Self {
        Self::with_make(lifetime, Make::Type(type_ctor::<I>, describe_type::<I>))
    }
}

impl<I: Send + Sync + 'static> Binding<I> {
    fn with_make(lifetime: Lifetime, make: Make<I>) -> Self {
        Self {
            lifetime,
            make,
            contracts: SmallVec::new(),
            overrides: Overrides::default(),
            disposer: None,
            eager: false,
        }
    }

    /// Factory provider.
    pub fn factory<F>(lifetime: Lifetime, factory: F) -> Self
    where
        F: for<'a> Fn(&ResolverContext<'a>) -> DiResult<I> + Send + Sync + 'static,
    {
        Self::with_make(lifetime, Make::Factory(Arc::new(factory)))
    }

    /// Pre-built instance, always a singleton.
    ///
    /// The container does not dispose supplied instances unless
    /// [`disposable`](Binding::disposable) is called.
    pub fn instance(value: I) -> Self {
        Self::shared(Arc::new(value))
    }

    /// Pre-built shared instance, always a singleton.
    pub fn shared(value: Arc<I>) -> Self {
        Self::with_make(Lifetime::Singleton, Make::Instance(value))
    }

    /// Also answer for the implementation type itself.
    pub fn as_self(mut self) -> Self {
        self.push_contract(ContractKey::of::<I>(), Arc::new(|instance: &AnyArc| {
            let concrete = downcast_impl::<I>(instance)?;
            Ok(boxed(concrete))
        }));
        self
    }

    /// Answer for contract `C`, converting the implementation with `cast`.
    ///
    /// For trait contracts `cast` is usually `|x| x`, letting unsized
    /// coercion do the work.
    pub fn as_contract<C>(mut self, cast: impl Fn(Arc<I>) -> Arc<C> + Send + Sync + 'static) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.push_contract(ContractKey::of::<C>(), Arc::new(move |instance: &AnyArc| {
            let concrete = downcast_impl::<I>(instance)?;
            Ok(boxed(cast(concrete)))
        }));
        self
    }

    /// Supplies `value` for every parameter or member named `name`.
    pub fn with_parameter<C>(mut self, name: &'static str, value: Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.overrides.insert(name, Override::Value(boxed(value)));
        self
    }

    /// Supplies the result of `factory` for every parameter or member named `name`.
    pub fn with_parameter_factory<C, F>(mut self, name: &'static str, factory: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: for<'a> Fn(&ResolverContext<'a>) -> DiResult<Arc<C>> + Send + Sync + 'static,
    {
        self.overrides.insert(
            name,
            Override::Factory(Arc::new(move |ctx: &ResolverContext<'_>| factory(ctx).map(boxed))),
        );
        self
    }

    /// Hands instances to their owning scope for disposal.
    ///
    /// Type providers whose injection shape already declares
    /// [`disposable`](crate::ShapeBuilder::disposable) are disposed once either way.
    pub fn disposable(mut self) -> Self
    where
        I: Dispose,
    {
        self.disposer = Some(|instance: &I| instance.dispose());
        self
    }

    /// Resolve this singleton as soon as the container is built.
    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    /// Lifetime of the binding.
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    fn push_contract(&mut self, key: ContractKey, cast: Caster) {
        self.contracts.retain(|c| c.key != key);
        self.contracts.push(Contract { key, cast });
    }

    pub(crate) fn into_registration(mut self) -> Registration {
        if self.contracts.is_empty() {
            self = self.as_self();
        }

        let overrides = Arc::new(self.overrides);
        let disposer = self.disposer;
        let (provider, ctor, describe): (ProviderKind, Ctor, Option<Describe>) = match self.make {
            Make::Type(make, describe) => (ProviderKind::Type, make(overrides.clone(), disposer), Some(describe)),
            Make::Factory(factory) => {
                let ctor: Ctor = Arc::new(move |ctx: &ResolverContext<'_>| {
                    let instance = Arc::new(factory(ctx)?);
                    Ok(built(instance, disposer))
                });
                (ProviderKind::Factory, ctor, None)
            }
            Make::Instance(instance) => {
                let ctor: Ctor = Arc::new(move |_: &ResolverContext<'_>| Ok(built(instance.clone(), disposer)));
                (ProviderKind::Instance, ctor, None)
            }
        };

        Registration {
            id: NEXT_REGISTRATION_ID.fetch_add(1, Ordering::Relaxed),
            lifetime: self.lifetime,
            implementation: TypeKey::of::<I>(),
            provider,
            family: None,
            contracts: self.contracts,
            ctor,
            describe,
            overrides,
            eager: self.eager,
            singleton: Mutex::new(None),
        }
    }
}

impl<C: ?Sized + Send + Sync + 'static> Binding<Arc<C>> {
    /// Factory provider for a trait-object contract.
    pub fn trait_factory<F>(lifetime: Lifetime, factory: F) -> Self
    where
        F: for<'a> Fn(&ResolverContext<'a>) -> DiResult<Arc<C>> + Send + Sync + 'static,
    {
        Binding::factory(lifetime, factory).as_contract::<C>(|outer| (*outer).clone())
    }

    /// Pre-built trait-object instance.
    pub fn trait_instance(value: Arc<C>) -> Self {
        Binding::instance(value).as_contract::<C>(|outer| (*outer).clone())
    }
}

fn downcast_impl<I: Send + Sync + 'static>(instance: &AnyArc) -> DiResult<Arc<I>> {
    instance
        .clone()
        .downcast::<I>()
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<I>()))
}

fn built<I: Send + Sync + 'static>(instance: Arc<I>, disposer: Option<fn(&I)>) -> Built {
    let dispose = disposer.map(|dispose| {
        let target = instance.clone();
        Box::new(move || dispose(&target)) as Disposer
    });
    Built {
        instance: instance as AnyArc,
        dispose,
    }
}

/// The shape's disposer wins over one set on the binding.
fn type_ctor<I: Injectable>(overrides: Arc<Overrides>, disposer: Option<fn(&I)>) -> Ctor {
    Arc::new(move |ctx: &ResolverContext<'_>| {
        let metadata = ctx.analyzer().analyze::<I>()?;
        let instance = Arc::new(ctx.instantiate(&metadata, &overrides)?);
        Ok(built(instance, metadata.disposer().or(disposer)))
    })
}

fn describe_type<I: Injectable>(analyzer: &TypeAnalyzer) -> DiResult<Arc<TypeInfo>> {
    analyzer.info::<I>()
}

/// Registrations held by one scope.
#[derive(Default)]
pub(crate) struct Registry {
    by_contract: FastMap<TypeId, Vec<Arc<Registration>>>,
    open: FastMap<TypeId, Arc<OpenRegistration>>,
    closed: RwLock<FastMap<TypeId, Arc<Registration>>>,
    ordered: Vec<Arc<Registration>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, registration: Registration) {
        let registration = Arc::new(registration);
        for contract in &registration.contracts {
            self.by_contract
                .entry(contract.key.id())
                .or_default()
                .push(registration.clone());
        }
        self.ordered.push(registration);
    }

    /// Later open bindings of the same family replace earlier ones.
    pub(crate) fn insert_open(&mut self, open: OpenRegistration) {
        self.open.insert(open.family.id(), Arc::new(open));
    }

    /// The registration `resolve` uses: the last one added for `key`.
    pub(crate) fn primary(&self, key: &ContractKey) -> Option<&Arc<Registration>> {
        self.by_contract.get(&key.id()).and_then(|regs| regs.last())
    }

    /// Every registration for `key`, in registration order.
    pub(crate) fn all(&self, key: &ContractKey) -> &[Arc<Registration>] {
        self.by_contract.get(&key.id()).map_or(&[], |regs| regs.as_slice())
    }

    pub(crate) fn contains(&self, key: &ContractKey) -> bool {
        self.by_contract.contains_key(&key.id())
    }

    pub(crate) fn has_open(&self, family: TypeKey) -> bool {
        self.open.contains_key(&family.id())
    }

    /// Closes an open-generic registration for `key`, reusing the closed
    /// registration on later requests.
    pub(crate) fn close(&self, key: &ContractKey) -> Option<Arc<Registration>> {
        let Some(Fallback::Generic { family, close }) = key.fallback() else {
            return None;
        };
        let open = self.open.get(&family.id())?;

        if let Some(registration) = self.closed.read().get(&key.id()) {
            return Some(registration.clone());
        }

        let mut closed = self.closed.write();
        let registration = closed.entry(key.id()).or_insert_with(|| {
            tracing::debug!(
                family = family.name(),
                contract = key.name(),
                lifetime = %open.lifetime,
                "closing open-generic registration"
            );
            Arc::new(close(open))
        });
        Some(registration.clone())
    }

    /// Registrations in the order they were added.
    pub(crate) fn registrations(&self) -> &[Arc<Registration>] {
        &self.ordered
    }

    pub(crate) fn closed_registrations(&self) -> Vec<Arc<Registration>> {
        self.closed.read().values().cloned().collect()
    }

    pub(crate) fn open_registrations(&self) -> impl Iterator<Item = &Arc<OpenRegistration>> {
        self.open.values()
    }

    /// Drops every cached singleton owned by this registry.
    pub(crate) fn release_singletons(&self) -> usize {
        self.ordered
            .iter()
            .cloned()
            .chain(self.closed_registrations())
            .filter_map(|r| r.take_singleton())
            .count()
    }

    pub(crate) fn len(&self) -> usize {
        self.ordered.len()
    }
}
