//! Declarative injection shapes.
//!
//! A type describes how it is built and which of its members receive
//! dependencies by implementing [`Injectable`]. The description is recorded
//! by a [`ShapeBuilder`] and turned into cached [`TypeMetadata`](super::TypeMetadata)
//! by the analyzer.

use std::sync::Arc;

use smallvec::SmallVec;

use super::{MemberKind, ParamInfo};
use crate::error::{DiError, DiResult};
use crate::generic::GenericContract;
use crate::key::{ContractKey, TypeKey};
use crate::registration::{unbox, AnyArc};
use crate::traits::Dispose;

/// A type the container can build from its declared injection shape.
///
/// `shape` is called once per analyzer and must be side-effect free: it only
/// records constructors, injectable members, an optional base, and the
/// disposal contract.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{Injectable, ShapeBuilder};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {}
/// struct Metrics;
///
/// struct Service {
///     logger: Arc<dyn Logger>,
///     metrics: Option<Arc<Metrics>>,
///     retries: Arc<u32>,
/// }
///
/// impl Injectable for Service {
///     fn shape(shape: &mut ShapeBuilder<Self>) {
///         shape
///             .constructor("new", |args| {
///                 Ok(Service { logger: args.next()?, metrics: None, retries: args.next()? })
///             })
///             .param::<dyn Logger>("logger")
///             .param_or_else("retries", || Arc::new(3u32));
///         shape
///             .field::<Metrics, _>("metrics", |s, m| s.metrics = Some(m))
///             .optional();
///     }
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Record this type's injection shape.
    fn shape(shape: &mut ShapeBuilder<Self>);
}

pub(crate) type DefaultFn = Arc<dyn Fn() -> AnyArc + Send + Sync>;
pub(crate) type ConstructorBody<T> = Arc<dyn Fn(&mut Args) -> DiResult<T> + Send + Sync>;
pub(crate) type MemberBody<T> = Arc<dyn Fn(&mut T, &mut Args) -> DiResult<()> + Send + Sync>;

/// A declared parameter together with its default producer.
#[derive(Clone)]
pub(crate) struct ParamDecl {
    pub(crate) info: ParamInfo,
    pub(crate) default: Option<DefaultFn>,
}

impl ParamDecl {
    fn new(name: &'static str, contract: ContractKey) -> Self {
        Self {
            info: ParamInfo {
                name,
                contract,
                optional: false,
                has_default: false,
            },
            default: None,
        }
    }
}

macro_rules! param_methods {
    () => {
        /// Declares a required parameter resolved as contract `C`.
        pub fn param<C>(&mut self, name: &'static str) -> &mut Self
        where
            C: ?Sized + Send + Sync + 'static,
        {
            self.params.push(ParamDecl::new(name, ContractKey::of::<C>()));
            self
        }

        /// Declares a parameter that is `None` when `C` has no binding.
        pub fn optional<C>(&mut self, name: &'static str) -> &mut Self
        where
            C: ?Sized + Send + Sync + 'static,
        {
            let mut decl = ParamDecl::new(name, ContractKey::of::<C>());
            decl.info.optional = true;
            self.params.push(decl);
            self
        }

        /// Declares a parameter that falls back to `default` when `C` has no binding.
        pub fn param_or_else<C, F>(&mut self, name: &'static str, default: F) -> &mut Self
        where
            C: ?Sized + Send + Sync + 'static,
            F: Fn() -> Arc<C> + Send + Sync + 'static,
        {
            let mut decl = ParamDecl::new(name, ContractKey::of::<C>());
            decl.info.has_default = true;
            decl.default = Some(Arc::new(move || Arc::new(default()) as AnyArc));
            self.params.push(decl);
            self
        }

        /// Declares a parameter whose type is a closed instantiation of an
        /// open-generic family.
        pub fn generic<C: GenericContract>(&mut self, name: &'static str) -> &mut Self {
            self.params.push(ParamDecl::new(name, ContractKey::generic::<C>()));
            self
        }

        /// Declares a parameter built from its own injection shape when it
        /// has no binding.
        pub fn constructed<C: Injectable>(&mut self, name: &'static str) -> &mut Self {
            self.params.push(ParamDecl::new(name, ContractKey::constructible::<C>()));
            self
        }
    };
}

/// A declared constructor.
///
/// Returned by [`ShapeBuilder::constructor`]; parameters are declared in the
/// order the body reads them from [`Args`].
pub struct ConstructorDecl<T> {
    pub(crate) name: &'static str,
    pub(crate) params: Vec<ParamDecl>,
    pub(crate) marked: bool,
    pub(crate) body: ConstructorBody<T>,
}

impl<T> ConstructorDecl<T> {
    param_methods!();

    /// Marks this constructor as the one to use for injection.
    pub fn inject(&mut self) -> &mut Self {
        self.marked = true;
        self
    }
}

/// A declared field, property or method.
pub struct MemberDecl<T> {
    pub(crate) name: &'static str,
    pub(crate) kind: MemberKind,
    pub(crate) declared_by: TypeKey,
    pub(crate) params: Vec<ParamDecl>,
    pub(crate) apply: MemberBody<T>,
}

impl<T: 'static> MemberDecl<T> {
    param_methods!();

    /// Skips the member when its dependencies have no binding.
    pub fn optional_member(&mut self) -> &mut Self {
        for p in &mut self.params {
            p.info.optional = true;
        }
        self
    }

    fn lift<D: 'static>(self, project: fn(&mut D) -> &mut T) -> MemberDecl<D> {
        let apply = self.apply;
        MemberDecl {
            name: self.name,
            kind: self.kind,
            declared_by: self.declared_by,
            params: self.params,
            apply: Arc::new(move |target: &mut D, args: &mut Args| apply(project(target), args)),
        }
    }
}

/// Handle returned for fields and properties.
///
/// Fields and properties have exactly one dependency, named after the member.
pub struct SlotDecl<'a, T> {
    decl: &'a mut MemberDecl<T>,
}

impl<T: 'static> SlotDecl<'_, T> {
    /// Leaves the member untouched when its contract has no binding.
    pub fn optional(self) -> Self {
        self.decl.optional_member();
        self
    }

    /// Supplies a default when the contract has no binding.
    pub fn or_else<C, F>(self, default: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<C> + Send + Sync + 'static,
    {
        if let Some(p) = self.decl.params.first_mut() {
            p.info.has_default = true;
            p.default = Some(Arc::new(move || Arc::new(default()) as AnyArc));
        }
        self
    }
}

pub(crate) struct BaseDecl<T> {
    lineage: Box<dyn Fn(&mut Vec<TypeKey>) -> DiResult<Vec<Level<T>>>>,
}

/// Members declared by one level of a type hierarchy.
pub(crate) struct Level<T> {
    pub(crate) ty: TypeKey,
    pub(crate) members: Vec<MemberDecl<T>>,
}

/// Recorder passed to [`Injectable::shape`].
pub struct ShapeBuilder<T> {
    ty: TypeKey,
    pub(crate) constructors: Vec<ConstructorDecl<T>>,
    pub(crate) members: Vec<MemberDecl<T>>,
    pub(crate) base: Option<BaseDecl<T>>,
    pub(crate) disposer: Option<fn(&T)>,
}

impl<T: Send + Sync + 'static> ShapeBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            ty: TypeKey::of::<T>(),
            constructors: Vec::new(),
            members: Vec::new(),
            base: None,
            disposer: None,
        }
    }

    /// Declares a constructor.
    ///
    /// The body reads its arguments from [`Args`] in declaration order.
    pub fn constructor<F>(&mut self, name: &'static str, body: F) -> &mut ConstructorDecl<T>
    where
        F: Fn(&mut Args) -> DiResult<T> + Send + Sync + 'static,
    {
        self.constructors.push(ConstructorDecl {
            name,
            params: Vec::new(),
            marked: false,
            body: Arc::new(body),
        });
        let last = self.constructors.len() - 1;
        &mut self.constructors[last]
    }

    /// Declares an injectable field of contract `C`.
    pub fn field<C, F>(&mut self, name: &'static str, set: F) -> SlotDecl<'_, T>
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(&mut T, Arc<C>) + Send + Sync + 'static,
    {
        self.slot(MemberKind::Field, name, set)
    }

    /// Declares an injectable property of contract `C`.
    pub fn property<C, F>(&mut self, name: &'static str, set: F) -> SlotDecl<'_, T>
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(&mut T, Arc<C>) + Send + Sync + 'static,
    {
        self.slot(MemberKind::Property, name, set)
    }

    /// Declares an injection method; parameters are declared on the returned handle.
    pub fn method<F>(&mut self, name: &'static str, body: F) -> &mut MemberDecl<T>
    where
        F: Fn(&mut T, &mut Args) -> DiResult<()> + Send + Sync + 'static,
    {
        self.push_member(MemberKind::Method, name, Vec::new(), Arc::new(body))
    }

    /// Inherits the injectable members of `B`, reached through `project`.
    ///
    /// Members of `B` (and its own bases) are injected before members of `T`.
    pub fn extends<B: Injectable>(&mut self, project: fn(&mut T) -> &mut B) -> &mut Self {
        self.base = Some(BaseDecl {
            lineage: Box::new(move |chain| {
                let declared = declare::<B>(chain)?;
                Ok(declared
                    .levels
                    .into_iter()
                    .map(|level| Level {
                        ty: level.ty,
                        members: level.members.into_iter().map(|m| m.lift(project)).collect(),
                    })
                    .collect())
            }),
        });
        self
    }

    /// Lets the owning scope dispose instances of `T`.
    pub fn disposable(&mut self) -> &mut Self
    where
        T: Dispose,
    {
        self.disposer = Some(|instance: &T| instance.dispose());
        self
    }

    fn slot<C, F>(&mut self, kind: MemberKind, name: &'static str, set: F) -> SlotDecl<'_, T>
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(&mut T, Arc<C>) + Send + Sync + 'static,
    {
        let params = vec![ParamDecl::new(name, ContractKey::of::<C>())];
        let apply: MemberBody<T> = Arc::new(move |target: &mut T, args: &mut Args| {
            if let Some(value) = args.next_optional::<C>()? {
                set(target, value);
            }
            Ok(())
        });
        SlotDecl {
            decl: self.push_member(kind, name, params, apply),
        }
    }

    fn push_member(
        &mut self,
        kind: MemberKind,
        name: &'static str,
        params: Vec<ParamDecl>,
        apply: MemberBody<T>,
    ) -> &mut MemberDecl<T> {
        self.members.push(MemberDecl {
            name,
            kind,
            declared_by: self.ty,
            params,
            apply,
        });
        let last = self.members.len() - 1;
        &mut self.members[last]
    }
}

/// Everything a type declares, with inherited members lifted onto it.
pub(crate) struct Declared<T> {
    pub(crate) constructors: Vec<ConstructorDecl<T>>,
    pub(crate) disposer: Option<fn(&T)>,
    /// Most derived level first.
    pub(crate) levels: Vec<Level<T>>,
}

/// Runs `T::shape` and walks its base chain.
pub(crate) fn declare<T: Injectable>(chain: &mut Vec<TypeKey>) -> DiResult<Declared<T>> {
    let ty = TypeKey::of::<T>();
    if chain.contains(&ty) {
        return Err(DiError::Analysis {
            type_name: chain.first().map(|k| k.name()).unwrap_or(ty.name()),
            member: ty.name(),
            reason: "inheritance cycle",
        });
    }

    chain.push(ty);
    let mut shape = ShapeBuilder::<T>::new();
    T::shape(&mut shape);

    let mut levels = vec![Level {
        ty,
        members: std::mem::take(&mut shape.members),
    }];
    let inherited = match &shape.base {
        Some(base) => (base.lineage)(chain),
        None => Ok(Vec::new()),
    };
    chain.pop();
    levels.extend(inherited?);

    Ok(Declared {
        constructors: shape.constructors,
        disposer: shape.disposer,
        levels,
    })
}

/// Arguments handed to constructor and method bodies.
///
/// Values are read positionally with [`next`](Args::next) in the order the
/// parameters were declared, or by parameter name with [`named`](Args::named).
pub struct Args {
    owner: &'static str,
    slots: SmallVec<[(&'static str, Option<AnyArc>); 4]>,
    cursor: usize,
}

impl Args {
    pub(crate) fn new(owner: &'static str, slots: SmallVec<[(&'static str, Option<AnyArc>); 4]>) -> Self {
        Self { owner, slots, cursor: 0 }
    }

    /// Reads the next argument as `Arc<C>`.
    pub fn next<C: ?Sized + Send + Sync + 'static>(&mut self) -> DiResult<Arc<C>> {
        let (name, value) = self.advance()?;
        match value {
            Some(value) => unbox::<C>(&value),
            None => Err(self.missing(name.to_string())),
        }
    }

    /// Reads the next argument, `None` when an optional dependency was absent.
    pub fn next_optional<C: ?Sized + Send + Sync + 'static>(&mut self) -> DiResult<Option<Arc<C>>> {
        let (_, value) = self.advance()?;
        value.map(|v| unbox::<C>(&v)).transpose()
    }

    /// Reads the argument declared as `name`, regardless of position.
    pub fn named<C: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<C>> {
        self.slots
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| v.as_ref())
            .ok_or_else(|| self.missing(name.to_string()))
            .and_then(unbox::<C>)
    }

    /// Number of declared arguments.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no arguments were declared.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn advance(&mut self) -> DiResult<(&'static str, Option<AnyArc>)> {
        let slot = self
            .slots
            .get(self.cursor)
            .map(|(name, value)| (*name, value.clone()))
            .ok_or_else(|| self.missing(format!("#{}", self.cursor)))?;
        self.cursor += 1;
        Ok(slot)
    }

    fn missing(&self, parameter: String) -> DiError {
        DiError::MissingArgument {
            owner: self.owner,
            parameter,
        }
    }
}
