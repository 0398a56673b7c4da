//! Circular dependency detection infrastructure.

use std::cell::RefCell;

use smallvec::SmallVec;

use crate::error::{DiError, DiResult};
use crate::key::TypeKey;

// Thread-local resolution state for circular dependency detection
thread_local! {
    static RESOLUTION_TLS: RefCell<SmallVec<[TypeKey; 16]>> = RefCell::new(SmallVec::new());
}

/// Guard for managing the thread-local resolution stack.
///
/// Entering pushes a type onto the stack of types currently under
/// construction on this thread; dropping the guard pops it, whether the
/// construction succeeded or failed.
pub(crate) struct StackGuard {
    key: TypeKey,
}

impl StackGuard {
    /// Pushes `key`, failing if it is already under construction or the
    /// stack is `max_depth` deep.
    pub(crate) fn enter(key: TypeKey, max_depth: usize) -> DiResult<Self> {
        RESOLUTION_TLS.with(|tls| {
            let mut stack = tls.borrow_mut();

            // Circular detection BEFORE pushing the new key
            if let Some(start) = stack.iter().position(|k| *k == key) {
                let mut path: Vec<&'static str> = stack[start..].iter().map(|k| k.name()).collect();
                path.push(key.name());
                return Err(DiError::CircularDependency { path });
            }

            if stack.len() >= max_depth {
                return Err(DiError::DepthExceeded(stack.len()));
            }

            stack.push(key);
            Ok(Self { key })
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_TLS.with(|tls| {
            let popped = tls.borrow_mut().pop();
            debug_assert_eq!(popped, Some(self.key));
        });
    }
}

/// Names of the types currently under construction on this thread, outermost first.
pub(crate) fn current_chain() -> Vec<&'static str> {
    RESOLUTION_TLS.with(|tls| tls.borrow().iter().map(|k| k.name()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;

    #[test]
    fn detects_reentry_and_reports_cycle() {
        let _a = StackGuard::enter(TypeKey::of::<A>(), 16).unwrap();
        let _b = StackGuard::enter(TypeKey::of::<B>(), 16).unwrap();
        match StackGuard::enter(TypeKey::of::<A>(), 16) {
            Err(DiError::CircularDependency { path }) => {
                assert_eq!(path.len(), 3);
                assert_eq!(path.first(), path.last());
            }
            other => panic!("expected a cycle, got {:?}", other.err()),
        }
        assert_eq!(current_chain().len(), 2);
    }

    #[test]
    fn guard_pops_on_drop() {
        {
            let _a = StackGuard::enter(TypeKey::of::<A>(), 16).unwrap();
            assert_eq!(current_chain(), vec![std::any::type_name::<A>()]);
        }
        assert!(current_chain().is_empty());
        assert!(StackGuard::enter(TypeKey::of::<A>(), 16).is_ok());
    }

    #[test]
    fn enforces_depth_limit() {
        let _a = StackGuard::enter(TypeKey::of::<A>(), 1).unwrap();
        assert_eq!(
            StackGuard::enter(TypeKey::of::<B>(), 1).err(),
            Some(DiError::DepthExceeded(1))
        );
    }
}
