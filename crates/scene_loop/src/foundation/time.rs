//! Time management utilities
//!
//! The loop never reads the system time directly. It asks a [`Clock`], so
//! hosts can substitute a deterministic time source for tests or replays.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Source of wall-clock time in milliseconds
pub trait Clock {
    /// Current time in milliseconds.
    ///
    /// Only differences between readings are meaningful; the origin is
    /// arbitrary. Readings must never decrease.
    fn now_ms(&self) -> f64;
}

/// Monotonic clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    /// Create a clock whose zero is the moment of creation
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Manually advanced clock
///
/// Clones share the same reading, so a test can keep one handle while the
/// loop owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    /// Create a clock reading zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock starting at the given reading
    pub fn starting_at(millis: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(millis)),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, millis: f64) {
        debug_assert!(millis >= 0.0, "clock readings must not decrease");
        self.now.set(self.now.get() + millis);
    }

    /// Set the reading directly
    pub fn set(&self, millis: f64) {
        self.now.set(millis);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}
