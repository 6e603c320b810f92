//! Display refresh signalling
//!
//! The loop needs exactly one thing from its host: a way to say "call
//! [`MainLoop::frame`] again before the next repaint". [`RefreshSignal`] is
//! that primitive. [`FrameRequests`] records the requests, and
//! [`PacedDriver`] turns them into frame calls at a fixed refresh rate for
//! hosts without a real display.

use crate::engine::{LoopError, MainLoop};
use std::cell::Cell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

/// "Run the loop once more before the next repaint"
pub trait RefreshSignal {
    /// Ask the host to call [`MainLoop::frame`] once before the next repaint
    fn request_frame(&mut self);
}

impl<F: FnMut()> RefreshSignal for F {
    fn request_frame(&mut self) {
        self();
    }
}

/// Shared record of refresh requests
///
/// Requests made before the host serves them coalesce into one pending
/// frame, the same as a display that repaints once per refresh. Clones
/// share state, so the host keeps one handle and the loop owns another.
#[derive(Debug, Clone, Default)]
pub struct FrameRequests {
    pending: Rc<Cell<bool>>,
    total: Rc<Cell<u64>>,
}

impl FrameRequests {
    /// Create a record with nothing pending
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a frame was requested and not yet served
    pub fn pending(&self) -> bool {
        self.pending.get()
    }

    /// Serve the pending request, returning whether there was one
    pub fn take(&self) -> bool {
        self.pending.replace(false)
    }

    /// Number of requests made since creation
    pub fn total(&self) -> u64 {
        self.total.get()
    }
}

impl RefreshSignal for FrameRequests {
    fn request_frame(&mut self) {
        self.pending.set(true);
        self.total.set(self.total.get() + 1);
    }
}

/// Host-side driver that serves frame requests at a fixed refresh rate
#[derive(Debug, Clone)]
pub struct PacedDriver {
    interval: Duration,
    requests: FrameRequests,
    frame_limit: Option<u64>,
}

impl PacedDriver {
    /// Create a driver refreshing `refresh_rate_hz` times per second
    ///
    /// Rates that are not positive and finite fall back to 60 Hz.
    pub fn new(refresh_rate_hz: f64) -> Self {
        let hz = if refresh_rate_hz.is_finite() && refresh_rate_hz > 0.0 {
            refresh_rate_hz
        } else {
            log::warn!("Invalid refresh rate {refresh_rate_hz}, using 60 Hz");
            60.0
        };
        Self {
            interval: Duration::from_secs_f64(1.0 / hz),
            requests: FrameRequests::new(),
            frame_limit: None,
        }
    }

    /// Stop after this many frames
    #[must_use]
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Signal to hand to [`crate::LoopBuilder::refresh`]
    pub fn requests(&self) -> FrameRequests {
        self.requests.clone()
    }

    /// Time between two refreshes
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Serve frames until the loop stops requesting them or the frame limit
    /// is reached, in which case the loop is paused.
    ///
    /// Returns the number of frames run. A facet error stops the driver and
    /// is returned; the loop itself keeps its state.
    pub fn run(&self, main_loop: &mut MainLoop) -> Result<u64, LoopError> {
        let mut frames = 0;
        let mut next_refresh = Instant::now();

        while self.requests.take() {
            if self.frame_limit.is_some_and(|limit| frames >= limit) {
                log::info!("Frame limit of {frames} reached");
                main_loop.pause();
                break;
            }

            next_refresh += self.interval;
            let now = Instant::now();
            if next_refresh > now {
                thread::sleep(next_refresh - now);
            } else {
                // Running late; do not try to make up missed refreshes
                next_refresh = now;
            }

            if main_loop.frame()?.is_some() {
                frames += 1;
            }
        }

        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LoopBuilder;
    use crate::scene::{Group, Node};

    #[test]
    fn test_requests_coalesce_until_served() {
        let requests = FrameRequests::new();
        let mut signal = requests.clone();

        signal.request_frame();
        signal.request_frame();
        assert!(requests.pending());
        assert_eq!(requests.total(), 2);

        assert!(requests.take());
        assert!(!requests.take());
        assert!(!requests.pending());
    }

    #[test]
    fn test_closure_is_a_refresh_signal() {
        let mut count = 0;
        {
            let mut signal = || count += 1;
            signal.request_frame();
            signal.request_frame();
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn test_invalid_rate_falls_back() {
        let driver = PacedDriver::new(0.0);
        assert_eq!(driver.interval(), Duration::from_secs_f64(1.0 / 60.0));
    }

    #[test]
    fn test_driver_stops_at_frame_limit() {
        let driver = PacedDriver::new(1000.0).with_frame_limit(5);
        let mut main_loop = LoopBuilder::new()
            .root(Node::new(Group::new()))
            .refresh(driver.requests())
            .build()
            .unwrap();

        main_loop.start();
        let frames = driver.run(&mut main_loop).unwrap();

        assert_eq!(frames, 5);
        assert!(!main_loop.is_running());
        assert_eq!(main_loop.stats().frames, 5);
    }

    #[test]
    fn test_driver_returns_when_nothing_requested() {
        let driver = PacedDriver::new(1000.0);
        let mut main_loop = LoopBuilder::new()
            .root(Node::new(Group::new()))
            .refresh(driver.requests())
            .build()
            .unwrap();

        assert_eq!(driver.run(&mut main_loop).unwrap(), 0);
    }
}
