//! Loop construction

use super::{LoopError, LoopStats, MainLoop};
use crate::core::config::LoopOptions;
use crate::driver::{FrameRequests, RefreshSignal};
use crate::foundation::time::{Clock, SystemClock};
use crate::scene::{DeferredUpdates, NodeRef};

/// Builder for [`MainLoop`]
///
/// Only the root is mandatory. The clock defaults to [`SystemClock`] and the
/// refresh signal to a [`FrameRequests`] nobody reads, which suits loops
/// driven with [`MainLoop::step`].
#[derive(Default)]
pub struct LoopBuilder {
    root: Option<NodeRef>,
    options: LoopOptions,
    clock: Option<Box<dyn Clock>>,
    refresh: Option<Box<dyn RefreshSignal>>,
}

impl LoopBuilder {
    /// Start with default options and no root
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scene root
    #[must_use]
    pub fn root(mut self, root: NodeRef) -> Self {
        self.root = Some(root);
        self
    }

    /// Set the loop options
    #[must_use]
    pub fn options(mut self, options: LoopOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the wall-clock source
    #[must_use]
    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Set the display refresh primitive
    #[must_use]
    pub fn refresh<R: RefreshSignal + 'static>(mut self, refresh: R) -> Self {
        self.refresh = Some(Box::new(refresh));
        self
    }

    /// Create the loop, stopped at simulated time 0.
    ///
    /// Fails before any frame is requested if the root is missing or the
    /// options are out of range.
    pub fn build(self) -> Result<MainLoop, LoopError> {
        let root = self.root.ok_or(LoopError::MissingRoot)?;
        self.options
            .validate()
            .map_err(|e| LoopError::InvalidOptions(e.to_string()))?;

        log::info!(
            "Loop created for root {} (delta {}ms, max {}ms per frame{})",
            root.id(),
            self.options.simulation_delta,
            self.options.max_simulation_time,
            if self.options.is_coupled() { ", coupled" } else { "" }
        );

        Ok(MainLoop {
            root,
            options: self.options,
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock::new())),
            refresh: self
                .refresh
                .unwrap_or_else(|| Box::new(FrameRequests::new())),
            updates: DeferredUpdates::new(),
            running: false,
            simulation_time: 0.0,
            accumulator: 0.0,
            last_time: None,
            average_frame_time: 0.0,
            stats: LoopStats::default(),
        })
    }
}

impl std::fmt::Debug for LoopBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopBuilder")
            .field("root", &self.root.as_ref().map(|root| root.id()))
            .field("options", &self.options)
            .field("custom_clock", &self.clock.is_some())
            .field("custom_refresh", &self.refresh.is_some())
            .finish()
    }
}
