//! Error types for the dependency injection container.

use thiserror::Error;

/// Dependency injection errors
///
/// Represents the error conditions raised while analyzing injectable types,
/// building a container, or resolving services from a scope.
///
/// Errors are `Clone` because analysis failures are cached by the
/// [`TypeAnalyzer`](crate::TypeAnalyzer) and replayed to every caller that
/// asks for the same type.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{ContainerBuilder, DiError, Resolver};
///
/// let container = ContainerBuilder::new().build().unwrap();
/// match container.resolve::<String>() {
///     Err(DiError::UnregisteredType { contract, .. }) => {
///         assert_eq!(contract, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_inject::DiError;
///
/// let circular = DiError::CircularDependency { path: vec!["ServiceA", "ServiceB", "ServiceA"] };
/// assert_eq!(
///     circular.to_string(),
///     "Circular dependency: ServiceA -> ServiceB -> ServiceA"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiError {
    /// A derived type re-declares an injectable member already declared by
    /// itself or by one of its bases.
    #[error("Duplicate injectable member `{member}` on {type_name} (declared by {declared_by}, already declared by {first_declared_by})")]
    DuplicateInjection {
        /// Type being analyzed
        type_name: &'static str,
        /// Conflicting member name
        member: &'static str,
        /// Level of the hierarchy holding the second declaration
        declared_by: &'static str,
        /// Level of the hierarchy holding the first declaration
        first_declared_by: &'static str,
    },

    /// More than one constructor is marked as the injection constructor.
    #[error("Ambiguous constructor on {type_name}: {count} constructors are marked for injection")]
    AmbiguousConstructor {
        /// Type being analyzed
        type_name: &'static str,
        /// Number of marked constructors
        count: usize,
    },

    /// A required contract has no registration anywhere in the scope chain.
    #[error("Unregistered type: {contract}{}", format_chain(.chain))]
    UnregisteredType {
        /// Requested contract
        contract: &'static str,
        /// Dependency chain that led to the request, outermost first
        chain: Vec<&'static str>,
    },

    /// Resolution re-entered a type that is already being constructed.
    #[error("Circular dependency: {}", .path.join(" -> "))]
    CircularDependency {
        /// The cycle, starting and ending with the repeated type
        path: Vec<&'static str>,
    },

    /// A malformed injection declaration.
    #[error("Analysis of {type_name} failed at `{member}`: {reason}")]
    Analysis {
        /// Type being analyzed
        type_name: &'static str,
        /// Offending declaration
        member: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },

    /// The builder was already turned into a container.
    #[error("Container builder is frozen; bindings cannot be added after build()")]
    BuilderFrozen,

    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),

    /// Maximum resolution depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),

    /// A constructor or method body asked for an argument that was not supplied.
    #[error("Missing argument `{parameter}` while building {owner}")]
    MissingArgument {
        /// Type whose constructor or member requested the argument
        owner: &'static str,
        /// Parameter name, or `#index` when read past the end
        parameter: String,
    },

    /// The scope was disposed.
    #[error("Scope {0} has been disposed")]
    ScopeDisposed(String),

    /// A parent scope was dropped while a child still resolves through it.
    #[error("Parent of scope {0} has been released")]
    ParentReleased(String),

    /// An option could not be parsed.
    #[error("Invalid value {value:?} for option {key}")]
    InvalidOption {
        /// Option name
        key: String,
        /// Rejected value
        value: String,
    },
}

fn format_chain(chain: &[&'static str]) -> String {
    if chain.is_empty() {
        String::new()
    } else {
        format!(" (required by {})", chain.join(" -> "))
    }
}

impl DiError {
    /// Returns `true` when this error reports a missing registration for `contract`.
    pub fn is_unregistered(&self, contract: &str) -> bool {
        matches!(self, DiError::UnregisteredType { contract: c, .. } if *c == contract)
    }
}

/// Result type for DI operations
///
/// A convenience type alias for `Result<T, DiError>` used throughout ferrous-inject.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{DiResult, DiError};
///
/// fn failing_operation() -> DiResult<()> {
///     Err(DiError::BuilderFrozen)
/// }
///
/// assert!(failing_operation().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;
