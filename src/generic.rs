//! Open-generic registrations.
//!
//! Rust has no runtime type constructors, so an open generic such as
//! `Repository<T>` is represented by a *family* marker type shared by every
//! instantiation. Each closed type names its family through
//! [`GenericContract::Family`]; binding the family once lets the container
//! build any instantiation requested through [`Resolver::resolve_generic`](crate::Resolver::resolve_generic)
//! or a [`generic`](crate::ConstructorDecl::generic) parameter.
//!
//! # Examples
//!
//! ```
//! use ferrous_inject::{ContainerBuilder, GenericContract, Injectable, Lifetime,
//!     OpenGenericBinding, Resolver, ShapeBuilder};
//! use std::marker::PhantomData;
//! use std::sync::Arc;
//!
//! struct RepositoryFamily;
//!
//! struct Repository<T> {
//!     _entity: PhantomData<fn() -> T>,
//! }
//!
//! impl<T: 'static> Injectable for Repository<T> {
//!     fn shape(shape: &mut ShapeBuilder<Self>) {
//!         shape.constructor("new", |_| Ok(Repository { _entity: PhantomData }));
//!     }
//! }
//!
//! impl<T: 'static> GenericContract for Repository<T> {
//!     type Family = RepositoryFamily;
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.bind_open(OpenGenericBinding::new::<RepositoryFamily>(Lifetime::Singleton)).unwrap();
//! let container = builder.build().unwrap();
//!
//! let users = container.resolve_generic::<Repository<String>>().unwrap();
//! let again = container.resolve_generic::<Repository<String>>().unwrap();
//! let orders = container.resolve_generic::<Repository<u64>>().unwrap();
//! assert!(Arc::ptr_eq(&users, &again));
//! # let _ = orders;
//! ```

use crate::key::{ContractKey, Fallback, TypeKey};
use crate::lifetime::Lifetime;
use crate::metadata::Injectable;
use crate::registration::{Binding, Registration};

/// A closed instantiation of an open-generic family.
pub trait GenericContract: Injectable {
    /// Marker type naming the family every instantiation belongs to.
    type Family: 'static;
}

impl ContractKey {
    /// Key for the closed generic `C`, falling back to an open-generic
    /// binding of `C::Family` when `C` has no exact registration.
    pub fn generic<C: GenericContract>() -> Self {
        ContractKey::with_fallback(
            TypeKey::of::<C>(),
            Fallback::Generic {
                family: TypeKey::of::<C::Family>(),
                close: close_generic::<C>,
            },
        )
    }
}

/// Registration of an open-generic family.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{ContainerBuilder, Lifetime, OpenGenericBinding};
///
/// struct HandlerFamily;
///
/// let mut builder = ContainerBuilder::new();
/// builder.bind_open(OpenGenericBinding::new::<HandlerFamily>(Lifetime::Transient)).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct OpenGenericBinding {
    family: TypeKey,
    lifetime: Lifetime,
}

impl OpenGenericBinding {
    /// Binds every instantiation of family `F` with `lifetime`.
    pub fn new<F: 'static>(lifetime: Lifetime) -> Self {
        Self {
            family: TypeKey::of::<F>(),
            lifetime,
        }
    }

    pub fn family(&self) -> TypeKey {
        self.family
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }
}

/// Open-generic registration held by a registry.
#[derive(Debug)]
pub(crate) struct OpenRegistration {
    pub(crate) family: TypeKey,
    pub(crate) lifetime: Lifetime,
}

impl From<OpenGenericBinding> for OpenRegistration {
    fn from(binding: OpenGenericBinding) -> Self {
        Self {
            family: binding.family,
            lifetime: binding.lifetime,
        }
    }
}

/// Builds the closed registration for `C` from an open registration.
fn close_generic<C: GenericContract>(open: &OpenRegistration) -> Registration {
    let binding = match open.lifetime {
        Lifetime::Singleton => Binding::<C>::singleton(),
        Lifetime::Scoped => Binding::<C>::scoped(),
        Lifetime::Transient => Binding::<C>::transient(),
    };
    binding.into_registration().closed_from(open.family)
}
