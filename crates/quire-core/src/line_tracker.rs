//! Line trackers.
//!
//! A line tracker keeps per-line data (highlighting state, folding markers,
//! heights) in step with the document. It hears about every structural step
//! of the line tree while an edit is applied, in the order the steps happen,
//! and before any `changed` handler runs.
//!
//! ## Learning: Default Trait Methods
//!
//! Every callback has an empty default body, so a tracker only implements
//! the steps it cares about.

use std::cell::RefCell;
use std::rc::Rc;

use quire_buffer::DocumentChangeEventArgs;

use crate::event::Subscription;
use crate::line::DocumentLine;

/// Observer of structural line changes.
pub trait LineTracker {
    /// `line` is about to be removed. It is still in the tree.
    fn before_remove_line(&mut self, line: DocumentLine<'_>) {
        let _ = line;
    }

    /// `line` is about to change its total length to `new_total_length`.
    /// The view still reports the old length.
    fn set_line_length(&mut self, line: DocumentLine<'_>, new_total_length: usize) {
        let _ = (line, new_total_length);
    }

    /// `new_line` was inserted directly after `inserted_after`. The lengths
    /// of both lines may still change during this edit.
    fn line_inserted(&mut self, inserted_after: DocumentLine<'_>, new_line: DocumentLine<'_>) {
        let _ = (inserted_after, new_line);
    }

    /// The whole line tree was rebuilt. Only the first line kept its handle.
    fn rebuild_document(&mut self) {}

    /// The edit is complete and every line has its final length.
    fn change_complete(&mut self, change: &DocumentChangeEventArgs) {
        let _ = change;
    }
}

pub(crate) type SharedTracker = Rc<RefCell<dyn LineTracker>>;

/// Keeps a line tracker registered. Dropping the handle, or calling
/// `remove`, unregisters it.
#[derive(Debug)]
#[must_use = "dropping a LineTrackerHandle unregisters the tracker immediately"]
pub struct LineTrackerHandle {
    subscription: Subscription,
}

impl LineTrackerHandle {
    pub(crate) fn new(subscription: Subscription) -> Self {
        Self { subscription }
    }

    /// Unregisters the tracker now.
    pub fn remove(self) {
        self.subscription.unsubscribe();
    }

    /// Keeps the tracker registered for the lifetime of the document.
    pub fn detach(self) {
        self.subscription.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_tree::LineTree;

    #[derive(Default)]
    struct Counting {
        calls: usize,
    }

    impl LineTracker for Counting {
        fn rebuild_document(&mut self) {
            self.calls += 1;
        }
    }

    #[test]
    fn test_default_methods_are_no_ops() {
        let tree = LineTree::new();
        let mut tracker = Counting::default();
        tracker.before_remove_line(tree.first_line());
        tracker.set_line_length(tree.first_line(), 3);
        tracker.line_inserted(tree.first_line(), tree.first_line());
        tracker.rebuild_document();
        assert_eq!(tracker.calls, 1);
    }
}
