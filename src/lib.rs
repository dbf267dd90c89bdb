// ============================================================================
// atom-bind - Shared State Atoms with Component Binding
// ============================================================================
//
// Two layers, leaf first:
//
// - Atom Store: an explicitly constructed registry of named, typed state
//   cells ("atoms"). Owns values, subscriber lists, and synchronous change
//   notification with reentrant-write queueing.
// - Component Binder: the capability a UI component holds to become
//   atom-aware without changing its render logic. Reads subscribe lazily
//   and idempotently; changes coalesce into one re-render request per
//   component; teardown revokes everything exactly once.
//
// Rendering itself stays with the host framework: the core only asks a
// RenderHost to re-render a component, and the host decides how and when.
// ============================================================================

pub mod binder;
pub mod core;
pub mod reactivity;
pub mod store;

// Re-export core items at crate root for ergonomic access
pub use crate::core::constants;
pub use crate::core::error::BinderError;
pub use crate::core::types::{AnyAtom, AtomListener, ComponentId, EqualsFn, default_equals};

// Re-export the store surface
pub use crate::store::def::AtomDef;
pub use crate::store::registry::AtomStore;
pub use crate::store::subscription::{Subscription, listener_fn};

// Re-export the binder surface
pub use crate::binder::binding::AtomBinder;
pub use crate::binder::host::RenderHost;

// Re-export reactivity helpers
pub use crate::reactivity::equality::{
    always_equals, equals, never_equals, safe_equals_f32, safe_equals_f64,
};
pub use crate::reactivity::scheduling::RenderQueue;

// =============================================================================
// TESTS
// =============================================================================
