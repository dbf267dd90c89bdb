// ============================================================================
// atom-bind - Core Module
// Fundamental types, traits, and constants shared by the store and binder
// ============================================================================

pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use error::BinderError;
pub use types::{AnyAtom, AtomListener, ComponentId, EqualsFn, default_equals};
