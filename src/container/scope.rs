//! Scope nodes and their lifecycle.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::config::ContainerOptions;
use crate::error::{DiError, DiResult};
use crate::internal::{DisposeBag, Disposer};
use crate::key::TypeKey;
use crate::metadata::TypeAnalyzer;
use crate::observer::Observers;
use crate::registration::{AnyArc, Registry};
use crate::FastMap;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of a scope within the process.
///
/// Displayed as `scope-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScopeId(u64);

impl ScopeId {
    fn next() -> Self {
        ScopeId(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

pub(crate) type ScopedSlot = Arc<Mutex<Option<AnyArc>>>;

/// Everything a new scope node is made of.
pub(crate) struct ScopeSeed {
    pub(crate) name: Option<String>,
    pub(crate) registry: Registry,
    pub(crate) analyzer: Arc<TypeAnalyzer>,
    pub(crate) observers: Observers,
    pub(crate) options: ContainerOptions,
}

/// One node of the scope tree.
///
/// The parent link is weak: a scope never keeps its ancestors alive.
pub(crate) struct ScopeInner {
    pub(crate) id: ScopeId,
    pub(crate) name: Option<String>,
    pub(crate) registry: Registry,
    parent: Option<Weak<ScopeInner>>,
    pub(crate) parent_id: Option<ScopeId>,
    pub(crate) depth: usize,
    children: Mutex<Vec<Weak<ScopeInner>>>,
    /// Scoped instances keyed by registration id
    scoped: Mutex<FastMap<u64, ScopedSlot>>,
    disposables: Mutex<DisposeBag>,
    disposed: AtomicBool,
    pub(crate) analyzer: Arc<TypeAnalyzer>,
    pub(crate) observers: Observers,
    pub(crate) options: ContainerOptions,
}

impl ScopeInner {
    pub(crate) fn new_root(seed: ScopeSeed) -> Arc<Self> {
        let scope = Arc::new(Self::from_seed(seed, None, 0));
        tracing::debug!(scope = %scope.id, registrations = scope.registry.len(), "root scope created");
        scope
    }

    pub(crate) fn new_child(parent: &Arc<ScopeInner>, seed: ScopeSeed) -> DiResult<Arc<Self>> {
        parent.ensure_live()?;
        let child = Arc::new(Self::from_seed(seed, Some(parent), parent.depth + 1));

        let mut children = parent.children.lock();
        children.retain(|c| c.strong_count() > 0);
        children.push(Arc::downgrade(&child));
        drop(children);

        tracing::debug!(
            scope = %child.id,
            parent = %parent.id,
            name = child.name.as_deref().unwrap_or(""),
            registrations = child.registry.len(),
            "child scope created"
        );
        Ok(child)
    }

    fn from_seed(seed: ScopeSeed, parent: Option<&Arc<ScopeInner>>, depth: usize) -> Self {
        Self {
            id: ScopeId::next(),
            name: seed.name,
            registry: seed.registry,
            parent: parent.map(Arc::downgrade),
            parent_id: parent.map(|p| p.id),
            depth,
            children: Mutex::new(Vec::new()),
            scoped: Mutex::new(FastMap::default()),
            disposables: Mutex::new(DisposeBag::default()),
            disposed: AtomicBool::new(false),
            analyzer: seed.analyzer,
            observers: seed.observers,
            options: seed.options,
        }
    }

    /// Scope name and id for messages.
    pub(crate) fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({})", name, self.id),
            None => self.id.to_string(),
        }
    }

    /// The parent node; `Ok(None)` for a root.
    pub(crate) fn parent(&self) -> DiResult<Option<Arc<ScopeInner>>> {
        match &self.parent {
            None => Ok(None),
            Some(weak) => weak
                .upgrade()
                .map(Some)
                .ok_or_else(|| DiError::ParentReleased(self.label())),
        }
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_live(&self) -> DiResult<()> {
        if self.is_disposed() {
            Err(DiError::ScopeDisposed(self.label()))
        } else {
            Ok(())
        }
    }

    pub(crate) fn live_children(&self) -> Vec<Arc<ScopeInner>> {
        self.children.lock().iter().filter_map(Weak::upgrade).collect()
    }

    /// Slot for a scoped registration in this scope.
    pub(crate) fn scoped_slot(&self, registration: u64) -> ScopedSlot {
        self.scoped.lock().entry(registration).or_default().clone()
    }

    /// Schedules `dispose` to run when this scope is disposed.
    pub(crate) fn track(&self, implementation: TypeKey, dispose: Option<Disposer>) {
        if let Some(dispose) = dispose {
            self.disposables.lock().push(implementation.name(), dispose);
        }
    }

    pub(crate) fn pending_disposals(&self) -> usize {
        self.disposables.lock().len()
    }

    /// Disposes live children (newest first), then this scope's own
    /// instances in reverse creation order, then drops its caches.
    ///
    /// Returns the number of disposers run by this scope; repeated calls
    /// return 0.
    pub(crate) fn dispose(&self) -> usize {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return 0;
        }

        let children = std::mem::take(&mut *self.children.lock());
        for child in children.iter().rev().filter_map(Weak::upgrade) {
            child.dispose();
        }

        let mut bag = std::mem::take(&mut *self.disposables.lock());
        let released = bag.run_all_reverse();

        let scoped = std::mem::take(&mut *self.scoped.lock());
        let singletons = self.registry.release_singletons();

        tracing::debug!(
            scope = %self.id,
            released,
            scoped = scoped.len(),
            singletons,
            "scope disposed"
        );
        drop(scoped);
        self.observers.scope_disposed(self.id, released);
        released
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if self.is_disposed() || self.disposables.get_mut().is_empty() {
            return;
        }
        if self.options.dispose_on_drop {
            self.dispose();
        } else {
            tracing::warn!(
                scope = %self.id,
                pending = self.disposables.get_mut().len(),
                "scope dropped with undisposed resources; call dispose() before dropping"
            );
        }
    }
}
