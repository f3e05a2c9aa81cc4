//! Document notifications.
//!
//! ## Learning: Observer Pattern in Rust
//!
//! Observers here are closures kept in ordered lists and called
//! synchronously, in registration order, while the document is borrowed
//! immutably. Every handler gets `&Document`. It can read anything but can't
//! edit, so a handler can never start a change while another change is being
//! dispatched. The compiler rules that out.
//!
//! Lists are `Rc<RefCell<..>>` so a `Subscription` can hold a `Weak` back to
//! its list and unregister itself on drop. Dispatch clones the handler list
//! first, so handlers may subscribe or unsubscribe while being called.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::document::Document;

/// A document property whose value changed at the end of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentProperty {
    /// The text changed
    Text,
    /// The text length changed
    TextLength,
    /// The number of lines changed
    LineCount,
}

/// Keeps a handler registered. Dropping it unregisters the handler.
#[must_use = "dropping a Subscription unregisters the handler immediately"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(remove: impl FnOnce() + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }

    /// Unregisters now.
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }

    /// Keeps the handler registered for the lifetime of the document.
    pub fn detach(mut self) {
        self.remove = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}

type Entries<T> = Rc<RefCell<Vec<(u64, Rc<T>)>>>;

/// Ordered, id-keyed list of shared observers.
pub(crate) struct ObserverList<T: ?Sized> {
    entries: Entries<T>,
    next_id: Cell<u64>,
}

impl<T: ?Sized + 'static> ObserverList<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(Vec::new())),
            next_id: Cell::new(0),
        }
    }

    pub(crate) fn add(&self, observer: Rc<T>) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push((id, observer));

        let entries: Weak<RefCell<Vec<(u64, Rc<T>)>>> = Rc::downgrade(&self.entries);
        Subscription::new(move || match entries.upgrade() {
            Some(entries) => entries.borrow_mut().retain(|(entry, _)| *entry != id),
            None => tracing::trace!("subscription outlived its document"),
        })
    }

    /// The observers at this moment, in registration order.
    pub(crate) fn snapshot(&self) -> Vec<Rc<T>> {
        self.entries
            .borrow()
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

type Handler<A> = dyn Fn(&Document, &A);

/// A synchronous event with arguments of type `A`.
pub struct EventList<A: ?Sized> {
    handlers: ObserverList<Handler<A>>,
}

impl<A: ?Sized + 'static> EventList<A> {
    pub(crate) fn new() -> Self {
        Self {
            handlers: ObserverList::new(),
        }
    }

    /// Registers `handler`. It stays registered while the returned
    /// `Subscription` is alive.
    pub fn subscribe(&self, handler: impl Fn(&Document, &A) + 'static) -> Subscription {
        self.handlers.add(Rc::new(handler))
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub(crate) fn emit(&self, document: &Document, args: &A) {
        for handler in self.handlers.snapshot() {
            handler(document, args);
        }
    }
}

impl<A: ?Sized + 'static> fmt::Debug for EventList<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventList")
            .field("handlers", &self.handler_count())
            .finish()
    }
}
