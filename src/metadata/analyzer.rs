//! Type analysis with a process-wide, single-flight cache.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;

use super::shape::{declare, ConstructorDecl, Level};
use super::{Injectable, MemberKind, TypeInfo, TypeMetadata};
use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::FastMap;

type Analysis = DiResult<Arc<dyn Any + Send + Sync>>;
type Slot = Arc<OnceCell<Analysis>>;

static GLOBAL: Lazy<Arc<TypeAnalyzer>> = Lazy::new(|| Arc::new(TypeAnalyzer::new()));

/// Computes and caches [`TypeMetadata`] per type.
///
/// Analysis runs at most once per type and analyzer, even when many threads
/// ask for the same type at the same time: late arrivals block until the
/// first analysis finishes and then share its result. Failures are cached
/// too, so a malformed type reports the same error on every request.
///
/// Containers use [`TypeAnalyzer::global`] unless a builder is given its own
/// instance with [`ContainerBuilder::with_analyzer`](crate::ContainerBuilder::with_analyzer).
///
/// # Examples
///
/// ```
/// use ferrous_inject::{injectable, TypeAnalyzer};
/// use std::sync::Arc;
///
/// struct Clock;
/// injectable!(Clock);
///
/// let analyzer = TypeAnalyzer::new();
/// let first = analyzer.analyze::<Clock>().unwrap();
/// let second = analyzer.analyze::<Clock>().unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
/// assert_eq!(analyzer.analysis_count(), 1);
/// assert_eq!(first.info().constructor().name(), "new");
/// ```
pub struct TypeAnalyzer {
    slots: RwLock<FastMap<TypeId, Slot>>,
    analyses: AtomicUsize,
}

impl TypeAnalyzer {
    /// Creates an empty analyzer with its own cache.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(FastMap::default()),
            analyses: AtomicUsize::new(0),
        }
    }

    /// The process-wide analyzer shared by default.
    pub fn global() -> Arc<TypeAnalyzer> {
        GLOBAL.clone()
    }

    /// Returns the metadata for `T`, analyzing it on first use.
    pub fn analyze<T: Injectable>(&self) -> DiResult<Arc<TypeMetadata<T>>> {
        let slot = self.slot(TypeId::of::<T>());
        let analysis = slot.get_or_init(|| {
            self.analyses.fetch_add(1, Ordering::Relaxed);
            analyze_type::<T>().map(|metadata| Arc::new(metadata) as Arc<dyn Any + Send + Sync>)
        });

        match analysis {
            Ok(any) => any
                .clone()
                .downcast::<TypeMetadata<T>>()
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>())),
            Err(err) => Err(err.clone()),
        }
    }

    /// Non-generic summary of `T`'s metadata.
    pub fn info<T: Injectable>(&self) -> DiResult<Arc<TypeInfo>> {
        self.analyze::<T>().map(|m| m.shared_info())
    }

    /// Whether `T` has been analyzed (successfully or not).
    pub fn is_analyzed<T: 'static>(&self) -> bool {
        self.slots
            .read()
            .get(&TypeId::of::<T>())
            .map_or(false, |slot| slot.get().is_some())
    }

    /// Number of analyses actually run.
    pub fn analysis_count(&self) -> usize {
        self.analyses.load(Ordering::Relaxed)
    }

    /// Number of types with a cache slot.
    pub fn cached_types(&self) -> usize {
        self.slots.read().len()
    }

    fn slot(&self, id: TypeId) -> Slot {
        if let Some(slot) = self.slots.read().get(&id) {
            return slot.clone();
        }
        self.slots.write().entry(id).or_default().clone()
    }
}

impl Default for TypeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeAnalyzer")
            .field("cached_types", &self.cached_types())
            .field("analysis_count", &self.analysis_count())
            .finish()
    }
}

fn analyze_type<T: Injectable>() -> DiResult<TypeMetadata<T>> {
    let ty = TypeKey::of::<T>();
    let mut chain = Vec::new();
    let declared = declare::<T>(&mut chain)?;

    check_names(ty, &declared.constructors, &declared.levels)?;
    check_duplicates(ty, &declared.levels)?;
    let hierarchy: Vec<TypeKey> = declared.levels.iter().map(|l| l.ty).collect();
    let constructor = select_constructor(ty, declared.constructors)?;

    // fields, then properties, then methods; each from the root base down
    let mut members = Vec::new();
    let mut levels = declared.levels;
    for kind in [MemberKind::Field, MemberKind::Property, MemberKind::Method] {
        for level in levels.iter_mut().rev() {
            let (matching, rest): (Vec<_>, Vec<_>) =
                std::mem::take(&mut level.members).into_iter().partition(|m| m.kind == kind);
            members.extend(matching);
            level.members = rest;
        }
    }

    tracing::debug!(
        service = ty.name(),
        constructor = constructor.name,
        members = members.len(),
        depth = hierarchy.len(),
        "analyzed injectable type"
    );

    Ok(TypeMetadata::assemble(ty, hierarchy, constructor, members, declared.disposer))
}

fn check_names<T>(ty: TypeKey, constructors: &[ConstructorDecl<T>], levels: &[Level<T>]) -> DiResult<()> {
    let blank = |member: &'static str, reason: &'static str| DiError::Analysis {
        type_name: ty.name(),
        member,
        reason,
    };

    for ctor in constructors {
        if ctor.name.is_empty() {
            return Err(blank("<constructor>", "constructor name is empty"));
        }
        if ctor.params.iter().any(|p| p.info.name.is_empty()) {
            return Err(blank(ctor.name, "parameter name is empty"));
        }
    }
    for member in levels.iter().flat_map(|l| l.members.iter()) {
        if member.name.is_empty() {
            return Err(blank("<member>", "member name is empty"));
        }
        if member.params.iter().any(|p| p.info.name.is_empty()) {
            return Err(blank(member.name, "parameter name is empty"));
        }
    }
    Ok(())
}

/// Walks the hierarchy from the most derived level to the root base and
/// rejects any member name seen twice.
fn check_duplicates<T>(ty: TypeKey, levels: &[Level<T>]) -> DiResult<()> {
    let mut seen: HashMap<&'static str, TypeKey> = HashMap::new();
    for level in levels {
        for member in &level.members {
            if let Some(first) = seen.insert(member.name, level.ty) {
                return Err(DiError::DuplicateInjection {
                    type_name: ty.name(),
                    member: member.name,
                    declared_by: first.name(),
                    first_declared_by: level.ty.name(),
                });
            }
        }
    }
    Ok(())
}

/// Exactly one marked constructor wins; otherwise the one with the most
/// parameters, earliest declaration breaking ties.
fn select_constructor<T>(ty: TypeKey, constructors: Vec<ConstructorDecl<T>>) -> DiResult<ConstructorDecl<T>> {
    let marked = constructors.iter().filter(|c| c.marked).count();
    if marked > 1 {
        return Err(DiError::AmbiguousConstructor {
            type_name: ty.name(),
            count: marked,
        });
    }

    let mut best: Option<ConstructorDecl<T>> = None;
    for ctor in constructors {
        let better = match &best {
            None => true,
            Some(current) if marked == 1 => ctor.marked && !current.marked,
            Some(current) => ctor.params.len() > current.params.len(),
        };
        if better {
            best = Some(ctor);
        }
    }

    best.ok_or(DiError::Analysis {
        type_name: ty.name(),
        member: "<constructor>",
        reason: "no constructor declared",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShapeBuilder;
    use std::sync::Arc;

    struct Plain;
    impl Injectable for Plain {
        fn shape(shape: &mut ShapeBuilder<Self>) {
            shape.constructor("new", |_| Ok(Plain));
        }
    }

    struct Broken;
    impl Injectable for Broken {
        fn shape(_: &mut ShapeBuilder<Self>) {}
    }

    #[test]
    fn slots_are_created_once() {
        let analyzer = TypeAnalyzer::new();
        assert!(!analyzer.is_analyzed::<Plain>());
        analyzer.analyze::<Plain>().unwrap();
        analyzer.analyze::<Plain>().unwrap();
        assert!(analyzer.is_analyzed::<Plain>());
        assert_eq!(analyzer.cached_types(), 1);
        assert_eq!(analyzer.analysis_count(), 1);
    }

    #[test]
    fn failures_are_cached() {
        let analyzer = TypeAnalyzer::new();
        let first = analyzer.analyze::<Broken>().err();
        let second = analyzer.analyze::<Broken>().err();
        assert!(matches!(first, Some(DiError::Analysis { reason: "no constructor declared", .. })));
        assert_eq!(first, second);
        assert_eq!(analyzer.analysis_count(), 1);
    }

    #[test]
    fn global_instance_is_shared() {
        assert!(Arc::ptr_eq(&TypeAnalyzer::global(), &TypeAnalyzer::global()));
    }
}
