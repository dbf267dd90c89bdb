// ============================================================================
// atom-bind - Constants
// Flag constants for binder lifecycle state
// ============================================================================

// =============================================================================
// TYPE FLAGS
// =============================================================================

/// The flag carrier is a component binder
pub const BINDER: u32 = 1 << 0;

// =============================================================================
// STATE FLAGS
// =============================================================================

/// Binder is clean (no pending re-render)
pub const CLEAN: u32 = 1 << 1;

/// Binder is dirty (re-render requested, further notifications coalesce)
pub const DIRTY: u32 = 1 << 2;

/// Binder has been torn down; writes are rejected, reads stop subscribing
pub const DESTROYED: u32 = 1 << 3;

// =============================================================================
// STATUS MASK (for clearing status bits)
// =============================================================================

/// Mask to clear the status bits (CLEAN, DIRTY)
pub const STATUS_MASK: u32 = !(CLEAN | DIRTY);

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_distinct() {
        let all_flags = [BINDER, CLEAN, DIRTY, DESTROYED];

        for (i, &a) in all_flags.iter().enumerate() {
            for (j, &b) in all_flags.iter().enumerate() {
                if i != j {
                    assert_eq!(a & b, 0, "Flags at index {} and {} overlap", i, j);
                }
            }
        }
    }

    #[test]
    fn status_mask_clears_status_bits() {
        let flags = BINDER | DIRTY;
        let cleared = flags & STATUS_MASK;

        assert_eq!(cleared & DIRTY, 0);
        assert_eq!(cleared & CLEAN, 0);
        assert_ne!(cleared & BINDER, 0);
    }

    #[test]
    fn status_mask_preserves_destroyed() {
        let flags = BINDER | CLEAN | DESTROYED;
        let transitioned = (flags & STATUS_MASK) | DIRTY;

        assert_ne!(transitioned & DESTROYED, 0);
        assert_ne!(transitioned & DIRTY, 0);
        assert_eq!(transitioned & CLEAN, 0);
    }
}
