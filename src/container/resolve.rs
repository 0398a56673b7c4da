//! The resolution engine.
//!
//! Lookup order for a contract requested from scope `S`:
//!
//! 1. the nearest exact registration, walking `S` and then its ancestors;
//! 2. otherwise, for generic contracts, the nearest open-generic registration
//!    of the contract's family, closed and cached in the scope that holds it;
//! 3. otherwise, for constructible contracts, the type's own injection shape;
//! 4. otherwise `UnregisteredType`.
//!
//! Singletons live in the scope whose registry holds the registration and
//! are built in that scope's context. Scoped instances live in `S`.
//! Transients are never cached.

use std::sync::Arc;
use std::time::Instant;

use super::context::ResolverContext;
use super::scope::ScopeInner;
use crate::error::{DiError, DiResult};
use crate::internal::{current_chain, StackGuard};
use crate::key::{ContractKey, Fallback, TypeKey};
use crate::lifetime::Lifetime;
use crate::observer::ResolutionEvent;
use crate::registration::{AnyArc, Registration};

/// What answered a request, for observers.
struct Activation {
    implementation: TypeKey,
    lifetime: Lifetime,
    reused: bool,
}

type Owned = (Arc<ScopeInner>, Arc<Registration>);

impl ScopeInner {
    /// Resolves one value for `key`, stored as `Arc<C>` erased.
    pub(crate) fn resolve(self: &Arc<Self>, key: &ContractKey) -> DiResult<AnyArc> {
        if !self.observers.has_observers() {
            return self.resolve_value(key).map(|(value, _)| value);
        }

        let started = Instant::now();
        match self.resolve_value(key) {
            Ok((value, activation)) => {
                self.observers.resolved(&ResolutionEvent {
                    contract: key.name(),
                    implementation: activation.implementation.name(),
                    lifetime: activation.lifetime,
                    scope: self.id,
                    scope_name: self.name.as_deref(),
                    duration: started.elapsed(),
                    reused: activation.reused,
                });
                Ok(value)
            }
            Err(err) => {
                self.observers.resolution_failed(key.name(), &err);
                Err(err)
            }
        }
    }

    fn resolve_value(self: &Arc<Self>, key: &ContractKey) -> DiResult<(AnyArc, Activation)> {
        self.ensure_live()?;
        let _frame = StackGuard::enter(key.type_key(), self.options.max_depth)?;

        if let Some((owner, registration)) = self.lookup(key)? {
            let (instance, reused) = self.activate(&owner, &registration, key.type_key())?;
            let value = registration.cast(key, &instance)?;
            return Ok((
                value,
                Activation {
                    implementation: registration.implementation,
                    lifetime: registration.lifetime,
                    reused,
                },
            ));
        }

        match key.fallback() {
            Some(Fallback::Construct(construct)) => {
                let value = construct(&ResolverContext::new(self))?;
                Ok((
                    value,
                    Activation {
                        implementation: key.type_key(),
                        lifetime: Lifetime::Transient,
                        reused: false,
                    },
                ))
            }
            _ => {
                let mut chain = current_chain();
                chain.pop();
                Err(DiError::UnregisteredType {
                    contract: key.name(),
                    chain,
                })
            }
        }
    }

    /// Every registration for `key` from the root down to this scope, each
    /// scope's in registration order.
    pub(crate) fn resolve_all(self: &Arc<Self>, key: &ContractKey) -> DiResult<Vec<AnyArc>> {
        let result = self.resolve_all_values(key);
        if let Err(err) = &result {
            if self.observers.has_observers() {
                self.observers.resolution_failed(key.name(), err);
            }
        }
        result
    }

    fn resolve_all_values(self: &Arc<Self>, key: &ContractKey) -> DiResult<Vec<AnyArc>> {
        self.ensure_live()?;
        let _frame = StackGuard::enter(key.type_key(), self.options.max_depth)?;

        let mut lineage = vec![self.clone()];
        while let Some(parent) = lineage[lineage.len() - 1].parent()? {
            lineage.push(parent);
        }

        let mut found: Vec<Owned> = Vec::new();
        for scope in lineage.iter().rev() {
            for registration in scope.registry.all(key) {
                found.push((scope.clone(), registration.clone()));
            }
        }
        if found.is_empty() && key.is_generic() {
            found.extend(self.lookup(key)?);
        }

        let mut values = Vec::with_capacity(found.len());
        for (owner, registration) in found {
            let started = Instant::now();
            let (instance, reused) = self.activate(&owner, &registration, key.type_key())?;
            values.push(registration.cast(key, &instance)?);

            if self.observers.has_observers() {
                self.observers.resolved(&ResolutionEvent {
                    contract: key.name(),
                    implementation: registration.implementation.name(),
                    lifetime: registration.lifetime,
                    scope: self.id,
                    scope_name: self.name.as_deref(),
                    duration: started.elapsed(),
                    reused,
                });
            }
        }
        Ok(values)
    }

    /// Finds the registration answering `key` and the scope that owns it.
    ///
    /// Exact registrations anywhere up the chain win over open generics.
    pub(crate) fn lookup(self: &Arc<Self>, key: &ContractKey) -> DiResult<Option<Owned>> {
        let mut scope = self.clone();
        loop {
            if let Some(registration) = scope.registry.primary(key).cloned() {
                return Ok(Some((scope, registration)));
            }
            match scope.parent()? {
                Some(parent) => scope = parent,
                None => break,
            }
        }

        if !key.is_generic() {
            return Ok(None);
        }

        let mut scope = self.clone();
        loop {
            if let Some(registration) = scope.registry.close(key) {
                return Ok(Some((scope, registration)));
            }
            match scope.parent()? {
                Some(parent) => scope = parent,
                None => return Ok(None),
            }
        }
    }

    /// Whether `key` can be satisfied from this scope.
    ///
    /// A released ancestor is an error, not a missing binding.
    pub(crate) fn can_resolve(self: &Arc<Self>, key: &ContractKey) -> DiResult<bool> {
        if key.is_constructible() {
            return Ok(true);
        }
        let family = match key.fallback() {
            Some(Fallback::Generic { family, .. }) => Some(family),
            _ => None,
        };

        let mut scope = self.clone();
        loop {
            if scope.registry.contains(key) || family.map_or(false, |f| scope.registry.has_open(f)) {
                return Ok(true);
            }
            match scope.parent()? {
                Some(parent) => scope = parent,
                None => return Ok(false),
            }
        }
    }

    /// Returns the instance for `registration`, building it if its lifetime
    /// does not have one cached. The flag is `true` for a cached instance.
    fn activate(
        self: &Arc<Self>,
        owner: &Arc<ScopeInner>,
        registration: &Arc<Registration>,
        requested: TypeKey,
    ) -> DiResult<(AnyArc, bool)> {
        // one implementation reached through two of its contracts is still a cycle
        let _frame = if registration.implementation != requested {
            Some(StackGuard::enter(registration.implementation, self.options.max_depth)?)
        } else {
            None
        };

        match registration.lifetime {
            Lifetime::Singleton => {
                owner.ensure_live()?;
                let mut slot = registration.singleton.lock();
                if let Some(instance) = slot.as_ref() {
                    tracing::trace!(implementation = registration.implementation.name(), "singleton cache hit");
                    return Ok((instance.clone(), true));
                }
                let instance = owner.build(registration)?;
                *slot = Some(instance.clone());
                Ok((instance, false))
            }
            Lifetime::Scoped => {
                let cell = self.scoped_slot(registration.id);
                let mut slot = cell.lock();
                if let Some(instance) = slot.as_ref() {
                    tracing::trace!(
                        scope = %self.id,
                        implementation = registration.implementation.name(),
                        "scoped cache hit"
                    );
                    return Ok((instance.clone(), true));
                }
                let instance = self.build(registration)?;
                *slot = Some(instance.clone());
                Ok((instance, false))
            }
            Lifetime::Transient => Ok((self.build(registration)?, false)),
        }
    }

    /// Runs the registration's constructor in this scope's context and
    /// tracks the result for disposal here.
    fn build(self: &Arc<Self>, registration: &Registration) -> DiResult<AnyArc> {
        let built = (registration.ctor)(&ResolverContext::new(self))?;
        tracing::trace!(
            scope = %self.id,
            implementation = registration.implementation.name(),
            lifetime = %registration.lifetime,
            "constructed instance"
        );
        self.track(registration.implementation, built.dispose);
        Ok(built.instance)
    }

    /// Builds an eager singleton ahead of the first request.
    pub(crate) fn warm(self: &Arc<Self>, registration: &Arc<Registration>) -> DiResult<()> {
        let _frame = StackGuard::enter(registration.implementation, self.options.max_depth)?;
        self.activate(self, registration, registration.implementation)?;
        Ok(())
    }
}
