//! Internal disposal bag for managing cleanup hooks.

use std::panic::{catch_unwind, AssertUnwindSafe};

/// A single deferred cleanup action.
pub(crate) type Disposer = Box<dyn FnOnce() + Send>;

/// Container for disposal hooks with LIFO execution order.
#[derive(Default)]
pub(crate) struct DisposeBag {
    hooks: Vec<(&'static str, Disposer)>,
}

impl DisposeBag {
    /// Add a disposal hook labelled with the type it tears down.
    pub(crate) fn push(&mut self, label: &'static str, f: Disposer) {
        self.hooks.push((label, f));
    }

    /// Execute all hooks in reverse order (LIFO), returning how many ran.
    ///
    /// A panicking hook is logged and does not stop the remaining hooks.
    pub(crate) fn run_all_reverse(&mut self) -> usize {
        let mut ran = 0;
        while let Some((label, f)) = self.hooks.pop() {
            if catch_unwind(AssertUnwindSafe(f)).is_err() {
                tracing::error!(service = label, "disposer panicked; continuing with remaining disposers");
            }
            ran += 1;
        }
        ran
    }

    /// Check if the bag is empty (no disposers registered).
    pub(crate) fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn runs_hooks_last_in_first_out() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bag = DisposeBag::default();
        for name in ["X", "Y", "Z"] {
            let log = log.clone();
            bag.push(name, Box::new(move || log.lock().unwrap().push(name)));
        }
        assert_eq!(bag.len(), 3);

        assert_eq!(bag.run_all_reverse(), 3);
        assert!(bag.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["Z", "Y", "X"]);
    }

    #[test]
    fn panicking_hook_does_not_stop_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bag = DisposeBag::default();
        let first = log.clone();
        bag.push("first", Box::new(move || first.lock().unwrap().push("first")));
        bag.push("boom", Box::new(|| panic!("disposer failure")));

        assert_eq!(bag.run_all_reverse(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
    }
}
