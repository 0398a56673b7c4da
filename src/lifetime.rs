//! Service lifetime definitions.

/// Service lifetimes controlling instance caching behavior
///
/// Defines when a registration produces a new instance and which scope keeps
/// it alive.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{injectable, Binding, ContainerBuilder, Resolver};
/// use std::sync::Arc;
///
/// struct Database;
/// struct Repository;
/// struct RequestModel;
/// injectable!(Database);
/// injectable!(Repository);
/// injectable!(RequestModel);
///
/// let mut builder = ContainerBuilder::new();
/// builder.bind(Binding::<Database>::singleton()).unwrap();
/// builder.bind(Binding::<Repository>::scoped()).unwrap();
/// builder.bind(Binding::<RequestModel>::transient()).unwrap();
/// let root = builder.build().unwrap();
///
/// // Singleton: same instance across scopes
/// let scope1 = root.create_scope().unwrap();
/// let db1 = root.resolve::<Database>().unwrap();
/// let db2 = scope1.resolve::<Database>().unwrap();
/// assert!(Arc::ptr_eq(&db1, &db2));
///
/// // Scoped: same within a scope, different across scopes
/// let repo1a = scope1.resolve::<Repository>().unwrap();
/// let repo1b = scope1.resolve::<Repository>().unwrap();
/// assert!(Arc::ptr_eq(&repo1a, &repo1b));
/// let scope2 = root.create_scope().unwrap();
/// assert!(!Arc::ptr_eq(&repo1a, &scope2.resolve::<Repository>().unwrap()));
///
/// // Transient: always a fresh instance
/// let m1 = scope1.resolve::<RequestModel>().unwrap();
/// let m2 = scope1.resolve::<RequestModel>().unwrap();
/// assert!(!Arc::ptr_eq(&m1, &m2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Lifetime {
    /// One instance per owning scope
    ///
    /// The instance is created on first request and cached by the scope whose
    /// registry holds the registration. Child scopes that inherit the
    /// registration share that instance; a child that re-registers the
    /// contract owns its own.
    Singleton,
    /// One instance per scope
    ///
    /// Cached in the scope where resolution was invoked, including the root.
    /// Sibling scopes never share scoped instances.
    Scoped,
    /// New instance per resolution, never cached
    Transient,
}

impl Lifetime {
    /// Short lowercase label used in logs and descriptors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Transient => "transient",
        }
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
