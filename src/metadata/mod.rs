//! Type metadata: analyzed injection plans.
//!
//! [`TypeAnalyzer`] turns the shape an [`Injectable`] type declares into a
//! [`TypeMetadata`]: the selected constructor plus the ordered list of
//! fields, properties and methods to inject after construction. Metadata is
//! computed once per type and shared.

mod analyzer;
mod shape;

pub use analyzer::TypeAnalyzer;
pub use shape::{Args, ConstructorDecl, Injectable, MemberDecl, ShapeBuilder, SlotDecl};

use shape::{ConstructorBody, ParamDecl};

use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{DiError, DiResult};
use crate::internal::current_chain;
use crate::key::{ContractKey, TypeKey};
use crate::registration::AnyArc;

/// Kind of an injectable member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Receives one dependency, assigned after construction.
    Field,
    /// Like a field, injected after all fields.
    Property,
    /// Called with its dependencies after fields and properties.
    Method,
}

/// A single dependency of a constructor or member.
#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub(crate) name: &'static str,
    pub(crate) contract: ContractKey,
    pub(crate) optional: bool,
    pub(crate) has_default: bool,
}

impl ParamInfo {
    /// Declared parameter name; parameter overrides match on it.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Contract resolved for this parameter.
    pub fn contract(&self) -> &ContractKey {
        &self.contract
    }

    /// Whether the parameter is `None` when its contract has no binding.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Whether the parameter falls back to a default value.
    pub fn has_default(&self) -> bool {
        self.has_default
    }

    /// Whether resolution fails when the contract has no binding.
    pub fn is_required(&self) -> bool {
        !self.optional && !self.has_default
    }
}

/// The constructor selected for injection.
#[derive(Debug, Clone)]
pub struct ConstructorInfo {
    name: &'static str,
    params: Vec<ParamInfo>,
    marked: bool,
}

impl ConstructorInfo {
    /// Declared constructor name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Parameters in declaration order.
    pub fn params(&self) -> &[ParamInfo] {
        &self.params
    }

    /// Whether the constructor was explicitly marked for injection.
    pub fn is_marked(&self) -> bool {
        self.marked
    }
}

/// An injectable field, property or method.
#[derive(Debug, Clone)]
pub struct MemberInfo {
    name: &'static str,
    kind: MemberKind,
    declared_by: TypeKey,
    params: Vec<ParamInfo>,
}

impl MemberInfo {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Level of the type hierarchy that declared the member.
    pub fn declared_by(&self) -> TypeKey {
        self.declared_by
    }

    pub fn params(&self) -> &[ParamInfo] {
        &self.params
    }
}

/// Non-generic view of an analyzed type.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    ty: TypeKey,
    constructor: ConstructorInfo,
    members: Vec<MemberInfo>,
    hierarchy: Vec<TypeKey>,
    disposable: bool,
}

impl TypeInfo {
    /// The analyzed type.
    pub fn type_key(&self) -> TypeKey {
        self.ty
    }

    /// The selected constructor.
    pub fn constructor(&self) -> &ConstructorInfo {
        &self.constructor
    }

    /// Injectable members in injection order: fields, then properties, then
    /// methods, each group from the root base to the most derived type.
    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }

    /// Members of one kind, in injection order.
    pub fn members_of(&self, kind: MemberKind) -> impl Iterator<Item = &MemberInfo> {
        self.members.iter().filter(move |m| m.kind == kind)
    }

    pub fn fields(&self) -> impl Iterator<Item = &MemberInfo> {
        self.members_of(MemberKind::Field)
    }

    pub fn properties(&self) -> impl Iterator<Item = &MemberInfo> {
        self.members_of(MemberKind::Property)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MemberInfo> {
        self.members_of(MemberKind::Method)
    }

    /// The type followed by its bases, most derived first.
    pub fn hierarchy(&self) -> &[TypeKey] {
        &self.hierarchy
    }

    /// Whether instances are handed to their owning scope for disposal.
    pub fn is_disposable(&self) -> bool {
        self.disposable
    }

    /// Whether the type has no members to inject after construction.
    pub fn is_passive(&self) -> bool {
        self.members.is_empty()
    }

    /// Every dependency: constructor parameters, then member parameters.
    pub fn dependencies(&self) -> impl Iterator<Item = &ParamInfo> {
        self.constructor
            .params
            .iter()
            .chain(self.members.iter().flat_map(|m| m.params.iter()))
    }
}

/// Supplies a value for a parameter, `None` when its contract has no binding.
pub(crate) type Supply<'s> = dyn FnMut(&ParamInfo) -> DiResult<Option<AnyArc>> + 's;

/// Analyzed injection plan for `T`.
///
/// Obtained from [`TypeAnalyzer::analyze`]; immutable and shared once built.
pub struct TypeMetadata<T> {
    info: Arc<TypeInfo>,
    constructor: ConstructorPlan<T>,
    members: Vec<MemberPlan<T>>,
    disposer: Option<fn(&T)>,
}

pub(crate) struct ConstructorPlan<T> {
    pub(crate) params: Vec<ParamDecl>,
    pub(crate) body: ConstructorBody<T>,
}

pub(crate) struct MemberPlan<T> {
    pub(crate) params: Vec<ParamDecl>,
    pub(crate) apply: shape::MemberBody<T>,
}

impl<T: 'static> TypeMetadata<T> {
    pub(crate) fn assemble(
        ty: TypeKey,
        hierarchy: Vec<TypeKey>,
        constructor: shape::ConstructorDecl<T>,
        members: Vec<shape::MemberDecl<T>>,
        disposer: Option<fn(&T)>,
    ) -> Self {
        let info = TypeInfo {
            ty,
            constructor: ConstructorInfo {
                name: constructor.name,
                params: constructor.params.iter().map(|p| p.info.clone()).collect(),
                marked: constructor.marked,
            },
            members: members
                .iter()
                .map(|m| MemberInfo {
                    name: m.name,
                    kind: m.kind,
                    declared_by: m.declared_by,
                    params: m.params.iter().map(|p| p.info.clone()).collect(),
                })
                .collect(),
            hierarchy,
            disposable: disposer.is_some(),
        };

        Self {
            info: Arc::new(info),
            constructor: ConstructorPlan {
                params: constructor.params,
                body: constructor.body,
            },
            members: members
                .into_iter()
                .map(|m| MemberPlan {
                    params: m.params,
                    apply: m.apply,
                })
                .collect(),
            disposer,
        }
    }

    /// Non-generic summary of the plan.
    pub fn info(&self) -> &TypeInfo {
        &self.info
    }

    pub(crate) fn shared_info(&self) -> Arc<TypeInfo> {
        self.info.clone()
    }

    pub(crate) fn disposer(&self) -> Option<fn(&T)> {
        self.disposer
    }

    /// Runs the constructor, then injects every member.
    pub(crate) fn instantiate(&self, supply: &mut Supply<'_>) -> DiResult<T> {
        let owner = self.info.ty.name();
        let mut args = collect_args(owner, &self.constructor.params, supply)?;
        let mut instance = (self.constructor.body)(&mut args)?;
        self.inject(&mut instance, supply)?;
        Ok(instance)
    }

    /// Injects fields, properties and methods into an existing instance.
    pub(crate) fn inject(&self, instance: &mut T, supply: &mut Supply<'_>) -> DiResult<()> {
        let owner = self.info.ty.name();
        for member in &self.members {
            let mut args = collect_args(owner, &member.params, supply)?;
            (member.apply)(instance, &mut args)?;
        }
        Ok(())
    }
}

fn collect_args(owner: &'static str, params: &[ParamDecl], supply: &mut Supply<'_>) -> DiResult<Args> {
    let mut slots = SmallVec::with_capacity(params.len());
    for param in params {
        let value = match supply(&param.info)? {
            Some(value) => Some(value),
            None => match &param.default {
                Some(default) => Some(default()),
                None if param.info.optional => None,
                None => {
                    let mut chain = current_chain();
                    chain.push(owner);
                    chain.dedup();
                    return Err(DiError::UnregisteredType {
                        contract: param.info.contract.name(),
                        chain,
                    });
                }
            },
        };
        slots.push((param.info.name, value));
    }
    Ok(Args::new(owner, slots))
}
