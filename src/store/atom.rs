// ============================================================================
// atom-bind - Atom Cell
// The store-owned state cell behind one key
// ============================================================================
//
// An AtomInner owns the current value, the equality gate, and the ordered
// subscriber list. Notification iterates a snapshot of that list: entries
// revoked mid-pass are skipped at delivery time, and listeners that
// subscribe or unsubscribe during the pass cannot invalidate the iteration.
// ============================================================================

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::core::types::{AnyAtom, EqualsFn};
use crate::store::def::AtomDef;
use crate::store::subscription::SubEntry;

// =============================================================================
// ATOM INNER
// =============================================================================

/// The state cell behind one atom key.
///
/// Separate from [`AtomDef`] so the registry can hold it as
/// `Rc<dyn AnyAtom>` regardless of the value type.
pub struct AtomInner<T> {
    /// The atom's key (shared with its definition)
    key: &'static str,

    /// The current value
    value: RefCell<T>,

    /// Equality gate: a write only notifies when this reports a change
    equals: EqualsFn<T>,

    /// Subscribers in subscription order (weak: an atom never keeps a
    /// listener alive)
    subscribers: RefCell<Vec<Rc<SubEntry>>>,
}

impl<T: Clone + fmt::Debug + 'static> AtomInner<T> {
    /// Materialize the cell with its declared default.
    pub(crate) fn new(def: &AtomDef<T>) -> Self {
        Self {
            key: def.key(),
            value: RefCell::new(def.make_default()),
            equals: def.equals_fn(),
            subscribers: RefCell::new(Vec::new()),
        }
    }

    /// Current value (cloning).
    pub(crate) fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Read the current value through a closure, without cloning.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Replace the value. Returns true when the equality gate reports a
    /// change; the caller decides whether to notify.
    pub(crate) fn set_value(&self, value: T) -> bool {
        let changed = {
            let current = self.value.borrow();
            !(self.equals)(&current, &value)
        };

        if changed {
            *self.value.borrow_mut() = value;
        }

        changed
    }

    /// Mutate the value in place. In-place mutation defeats the equality
    /// gate, so callers always notify after this.
    pub(crate) fn update_value(&self, f: impl FnOnce(&mut T)) {
        let mut current = self.value.borrow_mut();
        f(&mut current);
    }

    pub(crate) fn add_subscriber(&self, entry: Rc<SubEntry>) {
        self.subscribers.borrow_mut().push(entry);
    }

    /// Deliver one change notification to every current subscriber,
    /// synchronously and in subscription order.
    ///
    /// # Borrow safety
    /// The subscriber list is cloned into a snapshot before any listener
    /// runs, so a listener may subscribe or unsubscribe (on this atom or
    /// any other) without invalidating the iteration. Entries revoked
    /// after the snapshot was taken are skipped by the per-entry active
    /// check.
    pub(crate) fn notify(&self) {
        self.prune_subscribers();

        let snapshot: Vec<Rc<SubEntry>> = self.subscribers.borrow().clone();
        // Borrow on the list is released; listeners may mutate it freely.

        trace!(
            key = self.key,
            subscribers = snapshot.len(),
            "notifying subscribers"
        );

        for entry in snapshot {
            if !entry.is_active() {
                // Unsubscribed while this pass was in flight
                continue;
            }
            if let Some(listener) = entry.listener() {
                listener.on_atom_change(self.key);
            }
        }
    }
}

impl<T: Clone + fmt::Debug + 'static> AnyAtom for AtomInner<T> {
    fn key(&self) -> &'static str {
        self.key
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn subscriber_count(&self) -> usize {
        self.prune_subscribers();
        self.subscribers.borrow().len()
    }

    fn prune_subscribers(&self) {
        self.subscribers.borrow_mut().retain(|entry| entry.is_live());
    }

    fn debug_value(&self) -> String {
        format!("{:?}", self.value.borrow())
    }

    fn as_rc_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================
