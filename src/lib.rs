//! # ferrous-inject
//!
//! Dependency injection for Rust with declarative injection shapes, scope
//! trees and open generics.
//!
//! ## Features
//!
//! - **Injection shapes**: types declare constructors, injectable fields,
//!   properties and methods through [`Injectable`]; the [`TypeAnalyzer`]
//!   turns them into cached metadata, once per type
//! - **Lifetimes**: Singleton, Scoped and Transient registrations
//! - **Trait contracts**: one implementation can answer for several
//!   `dyn Trait` contracts and share one instance between them
//! - **Multi-binding**: the last registration wins for `resolve`, all of them
//!   are returned by `resolve_all`
//! - **Scope trees**: child scopes inherit and shadow their parent's
//!   registrations; disposal runs in reverse creation order
//! - **Open generics**: bind a generic family once, resolve any instantiation
//! - **Circular dependency detection** with the full cycle in the error
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_inject::{injectable, Binding, ContainerBuilder, Resolver};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str) -> String;
//! }
//!
//! struct ConsoleLogger;
//! injectable!(ConsoleLogger);
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) -> String {
//!         format!("[LOG] {}", message)
//!     }
//! }
//!
//! struct UserService {
//!     logger: Arc<dyn Logger>,
//! }
//! injectable!(UserService { logger: dyn Logger });
//!
//! let mut builder = ContainerBuilder::new();
//! builder
//!     .bind(Binding::<ConsoleLogger>::singleton().as_contract::<dyn Logger>(|l| l)).unwrap()
//!     .bind(Binding::<UserService>::transient()).unwrap();
//!
//! let container = builder.build().unwrap();
//! let users = container.resolve::<UserService>().unwrap();
//! assert_eq!(users.logger.log("hello"), "[LOG] hello");
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Singleton**: one instance per owning scope, the nearest scope whose own
//!   registrations contain the binding
//! - **Scoped**: one instance per scope the request is made against
//! - **Transient**: a new instance per resolution
//!
//! ## Scopes and Disposal
//!
//! ```rust
//! use ferrous_inject::{Binding, ContainerBuilder, Dispose, Injectable, Resolver, ShapeBuilder};
//! use std::sync::{Arc, Mutex};
//!
//! struct Connection { log: Arc<Mutex<Vec<&'static str>>> }
//!
//! impl Injectable for Connection {
//!     fn shape(shape: &mut ShapeBuilder<Self>) {
//!         shape
//!             .constructor("open", |args| Ok(Connection { log: args.next()? }))
//!             .param::<Mutex<Vec<&'static str>>>("log");
//!         shape.disposable();
//!     }
//! }
//!
//! impl Dispose for Connection {
//!     fn dispose(&self) {
//!         self.log.lock().unwrap().push("closed");
//!     }
//! }
//!
//! let log = Arc::new(Mutex::new(Vec::<&'static str>::new()));
//! let mut builder = ContainerBuilder::new();
//! builder.bind(Binding::shared(log.clone())).unwrap();
//! builder.bind(Binding::<Connection>::scoped()).unwrap();
//! let root = builder.build().unwrap();
//!
//! let request = root.create_scope().unwrap();
//! request.resolve::<Connection>().unwrap();
//! request.dispose();
//! assert_eq!(*log.lock().unwrap(), vec!["closed"]);
//! ```

// Module declarations
pub mod builder;
pub mod config;
pub mod container;
pub mod descriptors;
pub mod error;
pub mod generic;
pub mod key;
pub mod lifetime;
pub mod metadata;
pub mod observer;
pub mod traits;

// Internal modules
mod internal;
mod macros;
mod registration;

// Re-export core types
pub use builder::{ContainerBuilder, ContainerModule};
pub use config::ContainerOptions;
pub use container::{Container, ResolverContext, ScopeId};
pub use descriptors::ServiceDescriptor;
pub use error::{DiError, DiResult};
pub use generic::{GenericContract, OpenGenericBinding};
pub use key::{ContractKey, TypeKey};
pub use lifetime::Lifetime;
pub use metadata::{
    Args, ConstructorDecl, ConstructorInfo, Injectable, MemberDecl, MemberInfo, MemberKind, ParamInfo, ShapeBuilder,
    SlotDecl, TypeAnalyzer, TypeInfo, TypeMetadata,
};
pub use observer::{DiObserver, MetricsObserver, ResolutionEvent, ResolutionStats, TracingObserver};
pub use registration::{Binding, ProviderKind};
pub use traits::{Dispose, Resolver, ResolverCore};

#[cfg(feature = "ahash")]
pub(crate) type FastMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;

#[cfg(not(feature = "ahash"))]
pub(crate) type FastMap<K, V> = std::collections::HashMap<K, V>;
