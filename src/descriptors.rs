//! Service descriptors for introspection and diagnostics.

use crate::lifetime::Lifetime;
use crate::registration::{ProviderKind, Registration};

/// Service descriptor for introspection and diagnostics
///
/// Describes one registration held by a scope: the contracts it answers
/// for, the implementation type behind them and how instances are produced.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{injectable, Binding, ContainerBuilder, Lifetime, ProviderKind};
///
/// trait Logger: Send + Sync {}
///
/// struct ConsoleLogger;
/// injectable!(ConsoleLogger);
/// impl Logger for ConsoleLogger {}
///
/// struct Config { url: String }
///
/// let mut builder = ContainerBuilder::new();
/// builder.bind(Binding::<ConsoleLogger>::singleton().as_self().as_contract::<dyn Logger>(|l| l)).unwrap();
/// builder.bind(Binding::instance(Config { url: "postgres://localhost".into() })).unwrap();
/// let container = builder.build().unwrap();
///
/// let descriptors = container.descriptors();
/// assert_eq!(descriptors.len(), 2);
///
/// let logger = descriptors.iter()
///     .find(|d| d.implementation.contains("ConsoleLogger"))
///     .unwrap();
/// assert_eq!(logger.contracts.len(), 2);
/// assert_eq!(logger.lifetime, Lifetime::Singleton);
/// assert_eq!(logger.provider, ProviderKind::Type);
///
/// let config = descriptors.iter().find(|d| d.provider == ProviderKind::Instance).unwrap();
/// assert!(config.answers_for("Config"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ServiceDescriptor {
    /// Contract type names, in the order they were added to the binding
    pub contracts: Vec<&'static str>,
    /// Implementation type name
    pub implementation: &'static str,
    pub lifetime: Lifetime,
    pub provider: ProviderKind,
    /// Resolved right after build
    pub eager: bool,
    /// Open-generic family marker, for closed generic registrations
    pub family: Option<&'static str>,
}

impl ServiceDescriptor {
    pub(crate) fn from_registration(registration: &Registration) -> Self {
        Self {
            contracts: registration.contract_names(),
            implementation: registration.implementation.name(),
            lifetime: registration.lifetime,
            provider: registration.provider,
            eager: registration.eager,
            family: registration.family.map(|f| f.name()),
        }
    }

    /// Whether any contract name ends with `name`.
    ///
    /// Type names are module-qualified, so `answers_for("Logger")` matches
    /// `dyn my_app::Logger`.
    pub fn answers_for(&self, name: &str) -> bool {
        self.contracts.iter().any(|c| c.ends_with(name))
    }

    pub fn is_closed_generic(&self) -> bool {
        self.provider == ProviderKind::ClosedGeneric
    }
}
