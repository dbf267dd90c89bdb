// ============================================================================
// atom-bind - Subscription
// RAII interest relation between one atom and one listener
// ============================================================================

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::core::types::AtomListener;

// =============================================================================
// SUBSCRIBER ENTRY
// =============================================================================

/// One slot in an atom's subscriber list.
///
/// The atom holds the entry strongly but the listener only weakly, so a
/// subscription never keeps a component alive. The active flag is how a
/// revocation lands mid-notification: delivery iterates a snapshot of the
/// list and rechecks the flag per entry, so an entry revoked while a pass
/// is in flight is skipped without disturbing the iteration.
pub(crate) struct SubEntry {
    active: Cell<bool>,
    listener: Weak<dyn AtomListener>,
}

impl SubEntry {
    pub(crate) fn new(listener: Weak<dyn AtomListener>) -> Self {
        Self {
            active: Cell::new(true),
            listener,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Deactivate the entry, returning whether it was active.
    pub(crate) fn deactivate(&self) -> bool {
        self.active.replace(false)
    }

    pub(crate) fn listener(&self) -> Option<Rc<dyn AtomListener>> {
        self.listener.upgrade()
    }

    pub(crate) fn is_live(&self) -> bool {
        self.active.get() && self.listener.strong_count() > 0
    }
}

// =============================================================================
// SUBSCRIPTION HANDLE
// =============================================================================

/// Capability returned by [`AtomStore::subscribe`](crate::AtomStore::subscribe).
///
/// Revokes exactly the listener it was created for. Revocation happens
/// either explicitly through [`unsubscribe`](Subscription::unsubscribe)
/// (idempotent: the second call is a no-op) or implicitly when the handle
/// is dropped.
pub struct Subscription {
    key: &'static str,
    entry: Rc<SubEntry>,
}

impl Subscription {
    pub(crate) fn new(key: &'static str, entry: Rc<SubEntry>) -> Self {
        Self { key, entry }
    }

    /// Key of the atom this subscription listens to.
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Whether the subscription still delivers notifications.
    pub fn is_active(&self) -> bool {
        self.entry.is_active()
    }

    /// Stop delivering notifications to this listener. Effective
    /// immediately, even against an in-flight notification pass.
    pub fn unsubscribe(&self) {
        if self.entry.deactivate() {
            trace!(key = self.key, "subscription revoked");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("active", &self.entry.is_active())
            .finish()
    }
}

// =============================================================================
// CLOSURE LISTENER
// =============================================================================

struct FnListener<F>(F);

impl<F: Fn(&'static str) + 'static> AtomListener for FnListener<F> {
    fn on_atom_change(&self, key: &'static str) {
        (self.0)(key)
    }
}

/// Wrap a closure as an [`AtomListener`].
///
/// The caller owns the returned `Rc`; the store only holds it weakly, so
/// dropping it silences the listener even if the [`Subscription`] is kept.
///
/// # Example
///
/// ```
/// use atom_bind::{listener_fn, AtomDef, AtomStore};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// static COUNT: AtomDef<i32> = AtomDef::new("count", || 0);
///
/// let store = AtomStore::new();
/// let hits = Rc::new(Cell::new(0));
///
/// let hits_in = hits.clone();
/// let listener = listener_fn(move |_key| hits_in.set(hits_in.get() + 1));
/// let sub = store.subscribe(&COUNT, &listener);
///
/// store.set(&COUNT, 1);
/// assert_eq!(hits.get(), 1);
///
/// sub.unsubscribe();
/// store.set(&COUNT, 2);
/// assert_eq!(hits.get(), 1);
/// ```
pub fn listener_fn(f: impl Fn(&'static str) + 'static) -> Rc<dyn AtomListener> {
    Rc::new(FnListener(f))
}

// =============================================================================
// TESTS
// =============================================================================
