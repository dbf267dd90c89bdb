// ============================================================================
// atom-bind - Errors
// Lifecycle misuse surfaces loudly instead of silently succeeding
// ============================================================================

use thiserror::Error;

use crate::core::types::ComponentId;

/// Errors raised by a component binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BinderError {
    /// A component wrote through its binder after teardown. Subscriptions
    /// are gone at that point, so the write would succeed invisibly; reject
    /// it instead so the lifecycle bug surfaces.
    #[error("component {component:?} wrote atom `{key}` after teardown")]
    TornDown {
        component: ComponentId,
        key: &'static str,
    },
}

// =============================================================================
// TESTS
// =============================================================================
