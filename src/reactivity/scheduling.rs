// ============================================================================
// atom-bind - Render Scheduling
// Reference RenderHost: a deduplicating queue with a guarded flush loop
// ============================================================================
//
// The core only signals dirtiness; something must eventually turn requests
// into renders. Real integrations route requests into their framework's
// scheduler. RenderQueue is the in-crate stand-in for that scheduler, used
// by the tests and the demo harness: requests collect (deduplicated, in
// first-request order) until the driver flushes.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::binder::host::RenderHost;
use crate::core::types::ComponentId;

/// Maximum flush passes before we consider it an infinite loop
const MAX_FLUSH_PASSES: u32 = 1000;

// =============================================================================
// RENDER QUEUE
// =============================================================================

/// A deduplicating FIFO of re-render requests.
///
/// Cheaply clonable handle; clones feed the same queue. `flush` drains in
/// passes: renders that dirty further components (writes during render)
/// extend the flush rather than being lost, with a panic guard against
/// components that re-dirty themselves forever.
#[derive(Clone)]
pub struct RenderQueue {
    inner: Rc<QueueInner>,
}

struct QueueInner {
    pending: RefCell<Vec<ComponentId>>,
    flushing: Cell<bool>,
}

/// Clears the flushing flag even when a render panics.
struct FlushGuard(Rc<QueueInner>);

impl Drop for FlushGuard {
    fn drop(&mut self) {
        self.0.flushing.set(false);
    }
}

impl RenderQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(QueueInner {
                pending: RefCell::new(Vec::new()),
                flushing: Cell::new(false),
            }),
        }
    }

    /// Number of components awaiting a render.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.inner.pending.borrow().is_empty()
    }

    /// Drain the queue, calling `render` once per queued component.
    ///
    /// Components that get re-requested while the flush runs are picked up
    /// in a subsequent pass of the same flush. Reentrant `flush` calls are
    /// no-ops: the outer flush is already draining.
    pub fn flush(&self, mut render: impl FnMut(ComponentId)) {
        if self.inner.flushing.get() {
            return;
        }
        self.inner.flushing.set(true);
        let _guard = FlushGuard(self.inner.clone());

        let mut passes = 0u32;
        loop {
            let batch = self.inner.pending.replace(Vec::new());
            if batch.is_empty() {
                break;
            }

            passes += 1;
            if passes > MAX_FLUSH_PASSES {
                panic!(
                    "Maximum render depth exceeded. This can happen when a \
                     component keeps writing atoms it reads during render."
                );
            }

            trace!(components = batch.len(), pass = passes, "flushing renders");
            for component in batch {
                render(component);
            }
        }
    }
}

impl RenderHost for RenderQueue {
    fn request_render(&self, component: ComponentId) {
        let mut pending = self.inner.pending.borrow_mut();
        if !pending.contains(&component) {
            trace!(component = ?component, "render requested");
            pending.push(component);
        }
    }
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RenderQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderQueue")
            .field("pending", &self.pending_count())
            .field("flushing", &self.inner.flushing.get())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_deduplicate_in_first_request_order() {
        let queue = RenderQueue::new();

        queue.request_render(ComponentId(2));
        queue.request_render(ComponentId(1));
        queue.request_render(ComponentId(2));

        assert_eq!(queue.pending_count(), 2);

        let mut rendered = Vec::new();
        queue.flush(|id| rendered.push(id));

        assert_eq!(rendered, vec![ComponentId(2), ComponentId(1)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn requests_during_flush_run_in_a_later_pass() {
        let queue = RenderQueue::new();
        queue.request_render(ComponentId(1));

        let queue_in = queue.clone();
        let mut rendered = Vec::new();
        queue.flush(|id| {
            rendered.push(id);
            // The first render dirties component 2, once
            if id == ComponentId(1) {
                queue_in.request_render(ComponentId(2));
            }
        });

        assert_eq!(rendered, vec![ComponentId(1), ComponentId(2)]);
    }

    #[test]
    fn reentrant_flush_is_noop() {
        let queue = RenderQueue::new();
        queue.request_render(ComponentId(1));

        let queue_in = queue.clone();
        let mut rendered = Vec::new();
        queue.flush(|id| {
            rendered.push(id);
            // A render that tries to flush must not recurse
            queue_in.flush(|_| panic!("reentrant flush must not drain"));
        });

        assert_eq!(rendered, vec![ComponentId(1)]);
    }

    #[test]
    #[should_panic(expected = "Maximum render depth exceeded")]
    fn runaway_rerequest_panics() {
        let queue = RenderQueue::new();
        queue.request_render(ComponentId(1));

        let queue_in = queue.clone();
        queue.flush(|id| {
            // Self-perpetuating dirty loop
            queue_in.request_render(id);
        });
    }

    #[test]
    fn flush_on_empty_queue_is_noop() {
        let queue = RenderQueue::new();
        queue.flush(|_| panic!("nothing to render"));
        assert!(queue.is_empty());
    }
}
