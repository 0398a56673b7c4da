//! Module system for grouping registrations.

use crate::builder::ContainerBuilder;
use crate::error::DiResult;

/// A group of registrations added to a [`ContainerBuilder`] in one step.
///
/// Closures taking `&mut ContainerBuilder` are modules too.
///
/// # Example
///
/// ```rust
/// use ferrous_inject::{injectable, Binding, ContainerBuilder, ContainerModule, DiResult, Resolver};
/// use std::sync::Arc;
///
/// struct UserConfig;
/// injectable!(UserConfig);
///
/// struct UserService { config: Arc<UserConfig> }
/// injectable!(UserService { config: UserConfig });
///
/// struct UserModule;
///
/// impl ContainerModule for UserModule {
///     fn register(self, builder: &mut ContainerBuilder) -> DiResult<()> {
///         builder
///             .bind(Binding::<UserConfig>::singleton())?
///             .bind(Binding::<UserService>::scoped())?;
///         Ok(())
///     }
/// }
///
/// # fn main() -> DiResult<()> {
/// let mut builder = ContainerBuilder::new();
/// builder
///     .add_module(UserModule)?
///     .add_module(|b: &mut ContainerBuilder| -> DiResult<()> {
///         b.add_instance(42u32)?;
///         Ok(())
///     })?;
/// let container = builder.build()?;
/// let scope = container.create_scope()?;
/// assert!(scope.resolve::<UserService>().is_ok());
/// assert_eq!(*container.resolve::<u32>()?, 42);
/// # Ok(())
/// # }
/// ```
pub trait ContainerModule {
    /// Adds this module's registrations to `builder`.
    fn register(self, builder: &mut ContainerBuilder) -> DiResult<()>;
}

impl<F> ContainerModule for F
where
    F: FnOnce(&mut ContainerBuilder) -> DiResult<()>,
{
    fn register(self, builder: &mut ContainerBuilder) -> DiResult<()> {
        self(builder)
    }
}
