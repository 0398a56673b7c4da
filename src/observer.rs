//! Diagnostic observers for resolution events.
//!
//! Observers are the container's diagnostics collector: every successful
//! resolution is reported with the requested contract, the implementation
//! that answered, the scope and how long it took. A container with no
//! observers skips all of this bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::container::ScopeId;
use crate::error::DiError;
use crate::lifetime::Lifetime;

/// A successful resolution.
#[derive(Debug, Clone)]
pub struct ResolutionEvent<'a> {
    /// Contract that was requested
    pub contract: &'static str,
    /// Implementation type that answered
    pub implementation: &'static str,
    pub lifetime: Lifetime,
    /// Scope the request was made against
    pub scope: ScopeId,
    pub scope_name: Option<&'a str>,
    /// Wall time spent in the request, including nested resolutions
    pub duration: Duration,
    /// Whether a cached singleton or scoped instance was returned
    pub reused: bool,
}

/// Observer trait for dependency injection resolution events.
///
/// Calls are made synchronously on the resolving thread, so keep
/// implementations cheap.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{injectable, Binding, ContainerBuilder, DiObserver, ResolutionEvent, Resolver};
/// use std::sync::{Arc, Mutex};
///
/// #[derive(Default)]
/// struct Recorder(Mutex<Vec<&'static str>>);
///
/// impl DiObserver for Recorder {
///     fn resolved(&self, event: &ResolutionEvent<'_>) {
///         self.0.lock().unwrap().push(event.implementation);
///     }
/// }
///
/// struct Clock;
/// injectable!(Clock);
///
/// let recorder = Arc::new(Recorder::default());
/// let mut builder = ContainerBuilder::new();
/// builder.add_observer(recorder.clone());
/// builder.bind(Binding::<Clock>::singleton()).unwrap();
/// let container = builder.build().unwrap();
///
/// container.resolve::<Clock>().unwrap();
/// assert_eq!(recorder.0.lock().unwrap().len(), 1);
/// ```
pub trait DiObserver: Send + Sync {
    /// Called after each successful resolution.
    fn resolved(&self, event: &ResolutionEvent<'_>);

    /// Called when a resolution fails.
    fn resolution_failed(&self, _contract: &'static str, _error: &DiError) {}

    /// Called when a scope is built.
    fn scope_created(&self, _scope: ScopeId, _parent: Option<ScopeId>) {}

    /// Called when a scope is disposed, with the number of disposers that ran.
    fn scope_disposed(&self, _scope: ScopeId, _released: usize) {}
}

#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    pub(crate) fn extend(&mut self, other: Observers) {
        self.observers.extend(other.observers);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn resolved(&self, event: &ResolutionEvent<'_>) {
        for observer in &self.observers {
            observer.resolved(event);
        }
    }

    pub(crate) fn resolution_failed(&self, contract: &'static str, error: &DiError) {
        for observer in &self.observers {
            observer.resolution_failed(contract, error);
        }
    }

    pub(crate) fn scope_created(&self, scope: ScopeId, parent: Option<ScopeId>) {
        for observer in &self.observers {
            observer.scope_created(scope, parent);
        }
    }

    pub(crate) fn scope_disposed(&self, scope: ScopeId, released: usize) {
        for observer in &self.observers {
            observer.scope_disposed(scope, released);
        }
    }
}

/// Emits every event through `tracing`.
///
/// Resolutions are logged at `DEBUG` on the `ferrous_inject::resolution`
/// target, failures at `WARN`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl DiObserver for TracingObserver {
    fn resolved(&self, event: &ResolutionEvent<'_>) {
        tracing::debug!(
            target: "ferrous_inject::resolution",
            contract = event.contract,
            implementation = event.implementation,
            lifetime = %event.lifetime,
            scope = %event.scope,
            scope_name = event.scope_name.unwrap_or(""),
            duration_us = event.duration.as_micros() as u64,
            reused = event.reused,
            "resolved"
        );
    }

    fn resolution_failed(&self, contract: &'static str, error: &DiError) {
        tracing::warn!(target: "ferrous_inject::resolution", contract, %error, "resolution failed");
    }

    fn scope_created(&self, scope: ScopeId, parent: Option<ScopeId>) {
        tracing::debug!(
            target: "ferrous_inject::scope",
            scope = %scope,
            parent = parent.map(|p| p.to_string()).unwrap_or_default(),
            "scope created"
        );
    }

    fn scope_disposed(&self, scope: ScopeId, released: usize) {
        tracing::debug!(target: "ferrous_inject::scope", scope = %scope, released, "scope disposed");
    }
}

/// Per-contract resolution counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Successful resolutions
    pub resolved: u64,
    /// Of those, how many returned a cached instance
    pub reused: u64,
    pub failed: u64,
    /// Total time spent, including nested resolutions
    pub total_time: Duration,
}

/// Counts resolutions per contract.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{injectable, Binding, ContainerBuilder, MetricsObserver, Resolver};
/// use std::sync::Arc;
///
/// struct Clock;
/// injectable!(Clock);
///
/// let metrics = Arc::new(MetricsObserver::new());
/// let mut builder = ContainerBuilder::new();
/// builder.add_observer(metrics.clone());
/// builder.bind(Binding::<Clock>::singleton()).unwrap();
/// let container = builder.build().unwrap();
///
/// container.resolve::<Clock>().unwrap();
/// container.resolve::<Clock>().unwrap();
///
/// let stats = metrics.stats_for(std::any::type_name::<Clock>()).unwrap();
/// assert_eq!(stats.resolved, 2);
/// assert_eq!(stats.reused, 1);
/// ```
#[derive(Debug, Default)]
pub struct MetricsObserver {
    stats: Mutex<HashMap<&'static str, ResolutionStats>>,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for one contract.
    pub fn stats_for(&self, contract: &str) -> Option<ResolutionStats> {
        self.stats.lock().get(contract).copied()
    }

    /// Counters for every contract seen so far.
    pub fn snapshot(&self) -> HashMap<&'static str, ResolutionStats> {
        self.stats.lock().clone()
    }

    /// Sum of successful resolutions across contracts.
    pub fn total_resolutions(&self) -> u64 {
        self.stats.lock().values().map(|s| s.resolved).sum()
    }

    pub fn reset(&self) {
        self.stats.lock().clear();
    }
}

impl DiObserver for MetricsObserver {
    fn resolved(&self, event: &ResolutionEvent<'_>) {
        let mut stats = self.stats.lock();
        let entry = stats.entry(event.contract).or_default();
        entry.resolved += 1;
        if event.reused {
            entry.reused += 1;
        }
        entry.total_time += event.duration;
    }

    fn resolution_failed(&self, contract: &'static str, _error: &DiError) {
        self.stats.lock().entry(contract).or_default().failed += 1;
    }
}
