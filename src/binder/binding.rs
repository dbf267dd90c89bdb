// ============================================================================
// atom-bind - Component Binder
// The capability that makes a component atom-aware
// ============================================================================
//
// A component does not inherit reactivity; it holds an AtomBinder and
// delegates to it. Reads go through the binder so the first read of each
// atom becomes a subscription; notifications collapse into a single dirty
// flag and one render request; teardown revokes everything exactly once.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::core::constants::*;
use crate::core::error::BinderError;
use crate::core::types::{AtomListener, ComponentId};
use crate::binder::host::RenderHost;
use crate::store::def::AtomDef;
use crate::store::registry::AtomStore;
use crate::store::subscription::Subscription;

// =============================================================================
// ATOM BINDER
// =============================================================================

/// Per-component capability: subscribe-on-read, coalesced re-render
/// requests, pass-through writes, teardown-once.
///
/// # Example
///
/// ```
/// use atom_bind::{AtomBinder, AtomDef, AtomStore, ComponentId, RenderHost};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// static COUNT: AtomDef<i32> = AtomDef::new("count", || 0);
///
/// struct CountingHost(Cell<u32>);
/// impl RenderHost for CountingHost {
///     fn request_render(&self, _component: ComponentId) {
///         self.0.set(self.0.get() + 1);
///     }
/// }
///
/// let store = AtomStore::new();
/// let host = Rc::new(CountingHost(Cell::new(0)));
/// let binder = AtomBinder::new(store.clone(), host.clone(), ComponentId(1));
///
/// // First render: reading subscribes
/// binder.begin_render();
/// assert_eq!(binder.read(&COUNT), 0);
///
/// // Two writes in one turn coalesce into one render request
/// store.set(&COUNT, 1);
/// store.set(&COUNT, 2);
/// assert_eq!(host.0.get(), 1);
///
/// // The next render observes the latest value and re-arms the request
/// binder.begin_render();
/// assert_eq!(binder.read(&COUNT), 2);
/// store.set(&COUNT, 3);
/// assert_eq!(host.0.get(), 2);
/// ```
#[derive(Clone)]
pub struct AtomBinder {
    inner: Rc<BinderInner>,
}

struct BinderInner {
    /// Identity handed back through RenderHost::request_render
    component: ComponentId,

    /// The shared store this component binds against
    store: AtomStore,

    /// The host-framework seam for re-render requests
    host: Rc<dyn RenderHost>,

    /// BINDER | status bits (CLEAN / DIRTY / DESTROYED)
    flags: Cell<u32>,

    /// One subscription per atom key read so far; the dedup that makes
    /// repeated reads idempotent
    subscriptions: RefCell<HashMap<&'static str, Subscription>>,
}

impl AtomBinder {
    /// Bind a component (identified by `component`) to a store, routing
    /// re-render requests through `host`.
    pub fn new(store: AtomStore, host: Rc<dyn RenderHost>, component: ComponentId) -> Self {
        debug!(component = ?component, "binder created");
        Self {
            inner: Rc::new(BinderInner {
                component,
                store,
                host,
                flags: Cell::new(BINDER | CLEAN),
                subscriptions: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// The bound component's identity.
    pub fn component(&self) -> ComponentId {
        self.inner.component
    }

    // =========================================================================
    // READS (subscribe-on-read)
    // =========================================================================

    /// Read an atom, subscribing the component to it on first read.
    ///
    /// Subscribing is idempotent per (component, key): reading the same
    /// atom any number of times across any number of renders produces one
    /// subscription and therefore one notification per change. After
    /// teardown, reads still return the current value but no longer
    /// subscribe.
    pub fn read<T: Clone + fmt::Debug + 'static>(&self, def: &AtomDef<T>) -> T {
        let inner = &self.inner;

        if inner.flags.get() & DESTROYED != 0 {
            warn!(
                component = ?inner.component,
                key = def.key(),
                "read after teardown; no subscription created"
            );
            return inner.store.get(def);
        }

        let mut subscriptions = inner.subscriptions.borrow_mut();
        if !subscriptions.contains_key(def.key()) {
            let listener: Rc<dyn AtomListener> = inner.clone();
            let subscription = inner.store.subscribe(def, &listener);
            subscriptions.insert(def.key(), subscription);
            trace!(
                component = ?inner.component,
                key = def.key(),
                "subscribed on first read"
            );
        }
        drop(subscriptions);

        inner.store.get(def)
    }

    // =========================================================================
    // WRITES (pass-through)
    // =========================================================================

    /// Write an atom through the store. No extra bookkeeping: the binder
    /// forwards to [`AtomStore::set`] and lets notification flow back
    /// through subscriptions like any other write.
    ///
    /// Writing after teardown is a lifecycle bug and is rejected loudly.
    pub fn write<T: Clone + fmt::Debug + 'static>(
        &self,
        def: &AtomDef<T>,
        value: T,
    ) -> Result<(), BinderError> {
        if self.inner.flags.get() & DESTROYED != 0 {
            return Err(BinderError::TornDown {
                component: self.inner.component,
                key: def.key(),
            });
        }

        self.inner.store.set(def, value);
        Ok(())
    }

    // =========================================================================
    // RENDER LIFECYCLE
    // =========================================================================

    /// Mark the start of a render pass: clears the dirty flag so changes
    /// landing during or after this render arm a fresh request.
    pub fn begin_render(&self) {
        let flags = self.inner.flags.get();
        self.inner.flags.set((flags & STATUS_MASK) | CLEAN);
    }

    /// Whether a re-render request is pending.
    pub fn is_dirty(&self) -> bool {
        self.inner.flags.get() & DIRTY != 0
    }

    /// Whether the binder has been torn down.
    pub fn is_destroyed(&self) -> bool {
        self.inner.flags.get() & DESTROYED != 0
    }

    /// Number of atoms this component is currently subscribed to.
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.borrow().len()
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    /// Revoke every subscription exactly once and mark the binder
    /// destroyed. Idempotent: defensive double-teardown is a no-op. Also
    /// runs when the last handle drops.
    pub fn teardown(&self) {
        self.inner.teardown();
    }
}

impl BinderInner {
    fn teardown(&self) {
        if self.flags.get() & DESTROYED != 0 {
            return;
        }

        let subscriptions = self.subscriptions.replace(HashMap::new());
        debug!(
            component = ?self.component,
            subscriptions = subscriptions.len(),
            "binder teardown"
        );
        for (_key, subscription) in subscriptions {
            subscription.unsubscribe();
            // Dropping the handle would revoke too; the explicit call keeps
            // teardown observable in traces.
        }

        self.flags.set(BINDER | DESTROYED);
    }
}

impl AtomListener for BinderInner {
    fn on_atom_change(&self, key: &'static str) {
        let flags = self.flags.get();

        if flags & DESTROYED != 0 {
            // Teardown revoked our subscriptions; a straggler notification
            // from a snapshot must not resurrect the component.
            return;
        }

        if flags & DIRTY != 0 {
            trace!(
                component = ?self.component,
                key,
                "change coalesced into pending render"
            );
            return;
        }

        self.flags.set((flags & STATUS_MASK) | DIRTY);
        trace!(component = ?self.component, key, "dirty, requesting render");
        self.host.request_render(self.component);
    }
}

impl Drop for BinderInner {
    fn drop(&mut self) {
        // Subscriptions revoke themselves on drop; the flag transition is
        // only for the trace.
        if self.flags.get() & DESTROYED == 0 {
            debug!(component = ?self.component, "binder dropped without explicit teardown");
        }
    }
}

impl fmt::Debug for AtomBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomBinder")
            .field("component", &self.inner.component)
            .field("dirty", &self.is_dirty())
            .field("destroyed", &self.is_destroyed())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
