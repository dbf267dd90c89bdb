// ============================================================================
// atom-bind - Atom Store
// Keyed registry of atoms: materialization, writes, notification queueing
// ============================================================================
//
// The store is an explicitly constructed instance, not an ambient global.
// Typical applications create one with process-wide lifetime and share the
// handle; tests create as many isolated stores as they need.
//
// Writes issued from inside a notification listener are queued and applied
// after the current pass completes (queue, don't recurse), so a reentrant
// `set` can never corrupt the snapshot being iterated.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::core::types::{AnyAtom, AtomListener};
use crate::store::atom::AtomInner;
use crate::store::def::AtomDef;
use crate::store::subscription::{SubEntry, Subscription};

/// Maximum queued writes drained per outer `set` before we consider it an
/// infinite loop (a listener that keeps writing on every notification).
const MAX_DEFERRED_WRITES: u32 = 1000;

// =============================================================================
// ATOM STORE
// =============================================================================

/// Registry of named, typed state cells.
///
/// Cheaply clonable handle over shared interior state; clones observe the
/// same atoms. Atoms are materialized lazily on first access with the
/// default declared by their [`AtomDef`] and live as long as the store.
///
/// # Example
///
/// ```
/// use atom_bind::{AtomDef, AtomStore};
///
/// static COUNT: AtomDef<i32> = AtomDef::new("count", || 0);
///
/// let store = AtomStore::new();
///
/// // Absent atoms default-initialize; a write without subscribers still lands
/// assert_eq!(store.get(&COUNT), 0);
/// store.set(&COUNT, 1);
/// assert_eq!(store.get(&COUNT), 1);
/// ```
#[derive(Clone)]
pub struct AtomStore {
    inner: Rc<StoreInner>,
}

pub(crate) struct StoreInner {
    /// Key -> cell, in materialization order (stable `dump` output)
    atoms: RefCell<IndexMap<&'static str, Rc<dyn AnyAtom>>>,

    /// A notification pass is in flight; writes queue instead of recursing
    notifying: Cell<bool>,

    /// Writes queued during a notification pass, applied FIFO afterwards
    deferred: RefCell<VecDeque<Box<dyn FnOnce()>>>,
}

/// Restores the notifying flag even when a listener panics.
struct NotifyGuard(Rc<StoreInner>);

impl Drop for NotifyGuard {
    fn drop(&mut self) {
        self.0.notifying.set(false);
    }
}

impl AtomStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(StoreInner {
                atoms: RefCell::new(IndexMap::new()),
                notifying: Cell::new(false),
                deferred: RefCell::new(VecDeque::new()),
            }),
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Current value of the atom, materializing it with its declared
    /// default on first access. Never fails; absent atoms are implicitly
    /// initialized.
    pub fn get<T: Clone + fmt::Debug + 'static>(&self, def: &AtomDef<T>) -> T {
        self.materialize(def).get()
    }

    /// Read the atom's value through a closure, without cloning.
    ///
    /// # Example
    ///
    /// ```
    /// use atom_bind::{AtomDef, AtomStore};
    ///
    /// static ITEMS: AtomDef<Vec<i32>> = AtomDef::new("items", || vec![1, 2, 3]);
    ///
    /// let store = AtomStore::new();
    /// let sum = store.with(&ITEMS, |v| v.iter().sum::<i32>());
    /// assert_eq!(sum, 6);
    /// ```
    pub fn with<T: Clone + fmt::Debug + 'static, R>(
        &self,
        def: &AtomDef<T>,
        f: impl FnOnce(&T) -> R,
    ) -> R {
        self.materialize(def).with(f)
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Replace the atom's value.
    ///
    /// When the atom's equality policy reports a change, all current
    /// subscribers are notified synchronously, in subscription order,
    /// exactly once, before `set` returns. A `set` issued from inside a
    /// listener is queued and applied after the in-flight pass completes.
    pub fn set<T: Clone + fmt::Debug + 'static>(&self, def: &AtomDef<T>, value: T) {
        let atom = self.materialize(def);

        if self.inner.notifying.get() {
            trace!(key = def.key(), "write queued during notification pass");
            self.inner.deferred.borrow_mut().push_back(Box::new(move || {
                if atom.set_value(value) {
                    atom.notify();
                }
            }));
            return;
        }

        self.inner.notifying.set(true);
        let _guard = NotifyGuard(self.inner.clone());

        let changed = atom.set_value(value);
        trace!(key = def.key(), changed, "atom write");
        if changed {
            atom.notify();
        }

        self.drain_deferred();
    }

    /// Mutate the atom's value in place.
    ///
    /// In-place mutation is invisible to the equality gate, so subscribers
    /// are always notified. Queues like [`set`](AtomStore::set) when a
    /// notification pass is in flight.
    pub fn update<T: Clone + fmt::Debug + 'static>(
        &self,
        def: &AtomDef<T>,
        f: impl FnOnce(&mut T) + 'static,
    ) {
        let atom = self.materialize(def);

        if self.inner.notifying.get() {
            trace!(key = def.key(), "update queued during notification pass");
            self.inner.deferred.borrow_mut().push_back(Box::new(move || {
                atom.update_value(f);
                atom.notify();
            }));
            return;
        }

        self.inner.notifying.set(true);
        let _guard = NotifyGuard(self.inner.clone());

        atom.update_value(f);
        trace!(key = def.key(), "atom update");
        atom.notify();

        self.drain_deferred();
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    /// Register interest in an atom.
    ///
    /// The store holds `listener` weakly; the returned [`Subscription`] is
    /// the capability that removes exactly this listener, and also revokes
    /// on drop. Subscribing to an absent atom materializes it.
    pub fn subscribe<T: Clone + fmt::Debug + 'static>(
        &self,
        def: &AtomDef<T>,
        listener: &Rc<dyn AtomListener>,
    ) -> Subscription {
        let atom = self.materialize(def);
        let entry = Rc::new(SubEntry::new(Rc::downgrade(listener)));
        atom.add_subscriber(entry.clone());
        trace!(key = def.key(), "subscribed");
        Subscription::new(def.key(), entry)
    }

    // =========================================================================
    // INTROSPECTION
    // =========================================================================

    /// Number of materialized atoms.
    pub fn atom_count(&self) -> usize {
        self.inner.atoms.borrow().len()
    }

    /// Live subscriptions on one atom (materializes it if absent).
    pub fn subscriber_count<T: Clone + fmt::Debug + 'static>(&self, def: &AtomDef<T>) -> usize {
        self.materialize(def).subscriber_count()
    }

    /// Snapshot of every materialized atom as `(key, rendered value)`, in
    /// materialization order. This is what debug views render.
    pub fn dump(&self) -> Vec<(&'static str, String)> {
        self.inner
            .atoms
            .borrow()
            .iter()
            .map(|(key, atom)| (*key, atom.debug_value()))
            .collect()
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Look up or create the typed cell behind a definition.
    ///
    /// Panics when the key is already registered at a different value type:
    /// that is a programmer error, and failing fast beats handing back a
    /// cell the caller cannot read.
    fn materialize<T: Clone + fmt::Debug + 'static>(&self, def: &AtomDef<T>) -> Rc<AtomInner<T>> {
        if let Some(existing) = self.inner.atoms.borrow().get(def.key()).cloned() {
            return downcast_atom(existing, def);
        }

        // The default runs outside any registry borrow
        let fresh: Rc<AtomInner<T>> = Rc::new(AtomInner::new(def));
        debug!(
            key = def.key(),
            value_type = std::any::type_name::<T>(),
            "materialized atom"
        );

        let entry = self
            .inner
            .atoms
            .borrow_mut()
            .entry(def.key())
            .or_insert_with(|| fresh)
            .clone();
        downcast_atom(entry, def)
    }

    /// Apply writes queued during a notification pass, FIFO. Writes queued
    /// by the drained listeners land in the same queue and the same loop.
    fn drain_deferred(&self) {
        let mut processed = 0u32;
        loop {
            let job = self.inner.deferred.borrow_mut().pop_front();
            let Some(job) = job else { break };

            processed += 1;
            if processed > MAX_DEFERRED_WRITES {
                panic!(
                    "Maximum update depth exceeded. This can happen when a listener \
                     writes an atom on every notification it receives."
                );
            }

            job();
        }
    }
}

impl Default for AtomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AtomStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomStore")
            .field("atoms", &self.atom_count())
            .finish()
    }
}

fn downcast_atom<T: Clone + fmt::Debug + 'static>(
    atom: Rc<dyn AnyAtom>,
    def: &AtomDef<T>,
) -> Rc<AtomInner<T>> {
    let registered = atom.value_type_name();
    let any: Rc<dyn Any> = atom.as_rc_any();
    match any.downcast::<AtomInner<T>>() {
        Ok(inner) => inner,
        Err(_) => panic!(
            "atom key `{}` is already registered with value type {}, not {}",
            def.key(),
            registered,
            std::any::type_name::<T>()
        ),
    }
}

// =============================================================================
// TESTS
// =============================================================================
