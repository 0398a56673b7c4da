//! Type identity used for registration and lookup.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::container::ResolverContext;
use crate::error::DiResult;
use crate::generic::OpenRegistration;
use crate::registration::{AnyArc, Registration};

/// Runtime identity of a type, sized or not.
///
/// Equality and hashing use the `TypeId` only; the name is carried for
/// error messages and diagnostics.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::TypeKey;
///
/// trait Logger: Send + Sync {}
///
/// let a = TypeKey::of::<dyn Logger>();
/// let b = TypeKey::of::<dyn Logger>();
/// assert_eq!(a, b);
/// assert!(a.name().ends_with("Logger"));
/// assert_ne!(a, TypeKey::of::<String>());
/// ```
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The `std::any::type_name` of the type.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// What to do when a contract has no exact registration.
#[derive(Clone, Copy)]
pub(crate) enum Fallback {
    /// Close an open-generic registration of `family` for this contract.
    Generic {
        family: TypeKey,
        close: fn(&OpenRegistration) -> Registration,
    },
    /// Build the contract directly from its injection shape.
    Construct(fn(&ResolverContext<'_>) -> DiResult<AnyArc>),
}

/// The identity under which a service is requested.
///
/// A contract key is a [`TypeKey`] plus an optional fallback that tells the
/// resolver how to satisfy the request when no exact registration exists
/// (closing an open generic, or constructing an injectable type on demand).
/// The fallback never takes part in equality or hashing.
#[derive(Clone, Copy)]
pub struct ContractKey {
    ty: TypeKey,
    fallback: Option<Fallback>,
}

impl ContractKey {
    /// Plain key for contract `C`.
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self {
            ty: TypeKey::of::<C>(),
            fallback: None,
        }
    }

    pub(crate) fn with_fallback(ty: TypeKey, fallback: Fallback) -> Self {
        Self {
            ty,
            fallback: Some(fallback),
        }
    }

    /// Type identity of the contract.
    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.ty
    }

    /// The `TypeId` of the contract.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.ty.id
    }

    /// Display name of the contract.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.ty.name
    }

    /// Whether the key names an instantiation of an open-generic family.
    pub fn is_generic(&self) -> bool {
        matches!(self.fallback, Some(Fallback::Generic { .. }))
    }

    /// Whether the key can be built without any registration.
    pub fn is_constructible(&self) -> bool {
        matches!(self.fallback, Some(Fallback::Construct(_)))
    }

    pub(crate) fn fallback(&self) -> Option<Fallback> {
        self.fallback
    }
}

impl PartialEq for ContractKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty
    }
}

impl Eq for ContractKey {}

impl Hash for ContractKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ty.hash(state);
    }
}

impl fmt::Debug for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ContractKey");
        s.field("type", &self.ty.name);
        match self.fallback {
            Some(Fallback::Generic { family, .. }) => s.field("family", &family.name),
            Some(Fallback::Construct(_)) => s.field("constructible", &true),
            None => &mut s,
        };
        s.finish()
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ty.name)
    }
}
