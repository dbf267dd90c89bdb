// ============================================================================
// atom-bind - Atom Definitions
// Const-constructible descriptors: key, declared default, equality policy
// ============================================================================

use std::fmt;

use crate::core::types::{EqualsFn, default_equals};

// =============================================================================
// ATOM DEF
// =============================================================================

/// Static descriptor of an atom: a unique key, the default the atom is
/// materialized with on first access, and the equality policy that gates
/// notification on writes.
///
/// Definitions carry no state, so they are `Copy` and usually live in
/// `static`s shared by every component that touches the atom:
///
/// ```
/// use atom_bind::{AtomDef, AtomStore};
///
/// static COUNT: AtomDef<i32> = AtomDef::new("count", || 0);
///
/// let store = AtomStore::new();
/// assert_eq!(store.get(&COUNT), 0);
///
/// store.set(&COUNT, 5);
/// assert_eq!(store.get(&COUNT), 5);
/// ```
///
/// A key must map to one value type per store; re-declaring it at another
/// type panics on the second materialization.
pub struct AtomDef<T> {
    key: &'static str,
    default: fn() -> T,
    equals: EqualsFn<T>,
}

impl<T> AtomDef<T> {
    /// Define an atom with the default `PartialEq` equality policy.
    pub const fn new(key: &'static str, default: fn() -> T) -> Self
    where
        T: PartialEq,
    {
        Self {
            key,
            default,
            equals: default_equals::<T>,
        }
    }

    /// Define an atom with a custom equality policy.
    ///
    /// # Example
    ///
    /// ```
    /// use atom_bind::{never_equals, AtomDef};
    ///
    /// // Every write notifies, even when the value is unchanged
    /// static TICK: AtomDef<u32> = AtomDef::with_equals("tick", || 0, never_equals);
    /// ```
    pub const fn with_equals(key: &'static str, default: fn() -> T, equals: EqualsFn<T>) -> Self {
        Self {
            key,
            default,
            equals,
        }
    }

    /// The atom's unique key.
    pub fn key(&self) -> &'static str {
        self.key
    }

    pub(crate) fn make_default(&self) -> T {
        (self.default)()
    }

    pub(crate) fn equals_fn(&self) -> EqualsFn<T> {
        self.equals
    }
}

// Manual impls: derive would put a spurious `T: Clone`/`T: Copy` bound on
// a struct that only holds fn pointers.
impl<T> Clone for AtomDef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AtomDef<T> {}

impl<T> fmt::Debug for AtomDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomDef")
            .field("key", &self.key)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactivity::equality::never_equals;

    static COUNT: AtomDef<i32> = AtomDef::new("count", || 0);
    static LABEL: AtomDef<String> = AtomDef::new("label", String::new);

    #[test]
    fn def_is_const_constructible_in_statics() {
        assert_eq!(COUNT.key(), "count");
        assert_eq!(COUNT.make_default(), 0);

        assert_eq!(LABEL.key(), "label");
        assert_eq!(LABEL.make_default(), "");
    }

    #[test]
    fn default_policy_is_partial_eq() {
        let eq = COUNT.equals_fn();
        assert!(eq(&1, &1));
        assert!(!eq(&1, &2));
    }

    #[test]
    fn custom_policy_is_carried() {
        static TICK: AtomDef<u32> = AtomDef::with_equals("tick", || 0, never_equals);

        let eq = TICK.equals_fn();
        assert!(!eq(&1, &1));
    }

    #[test]
    fn defs_are_copy() {
        let a = COUNT;
        let b = a;
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn debug_names_key_and_type() {
        let rendered = format!("{:?}", COUNT);
        assert!(rendered.contains("count"));
        assert!(rendered.contains("i32"));
    }
}
