//! Deferred model mutations
//!
//! Simulate passes only read the scene. Writes are staged here and applied
//! once the whole pass is over, so every node in a chunk observes the same
//! pre-mutation snapshot.

use std::cell::RefCell;
use std::collections::VecDeque;

/// A staged write to scene state
pub type Mutation = Box<dyn FnOnce()>;

/// FIFO queue of staged mutations, owned by one loop
///
/// Scheduling goes through `&self` so every facet of a pass can share one
/// reference to the queue.
#[derive(Default)]
pub struct DeferredUpdates {
    queue: RefCell<VecDeque<Mutation>>,
}

impl DeferredUpdates {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a mutation to run after the current simulate pass
    pub fn schedule<F>(&self, mutation: F)
    where
        F: FnOnce() + 'static,
    {
        self.queue.borrow_mut().push_back(Box::new(mutation));
    }

    /// Number of staged mutations
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Whether nothing is staged
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Apply every staged mutation in the order it was scheduled.
    ///
    /// Mutations scheduled while flushing run in the same flush, after
    /// everything that was already queued. Returns how many were applied.
    pub fn flush(&self) -> usize {
        let mut applied = 0;
        loop {
            // The borrow must end before the mutation runs; it may schedule more
            let next = self.queue.borrow_mut().pop_front();
            let Some(mutation) = next else {
                break;
            };
            mutation();
            applied += 1;
        }
        applied
    }

    /// Drop every staged mutation without applying it. Returns how many were dropped.
    pub fn discard(&self) -> usize {
        let dropped = std::mem::take(&mut *self.queue.borrow_mut());
        dropped.len()
    }
}

impl std::fmt::Debug for DeferredUpdates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredUpdates")
            .field("pending", &self.len())
            .finish()
    }
}
