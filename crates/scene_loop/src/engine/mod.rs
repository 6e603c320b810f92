//! Main loop implementation
//!
//! [`MainLoop`] turns display refreshes into fixed-size simulation chunks
//! followed by one render pass:
//!
//! 1. measure the wall-clock time since the previous frame
//! 2. clamp it to `max_simulation_time` and add it to the accumulator
//! 3. while a whole chunk fits in the accumulator, run one simulate pass
//!    over the scene, then apply the updates it staged
//! 4. render once, passing how far the accumulator got into the next chunk
//!
//! The host drives the loop by calling [`MainLoop::frame`] whenever the
//! injected [`RefreshSignal`] asked for it, or steps it by hand with
//! [`MainLoop::step`] while it is stopped.

mod builder;

pub use builder::LoopBuilder;

use crate::core::config::LoopOptions;
use crate::driver::RefreshSignal;
use crate::foundation::time::Clock;
use crate::scene::{
    traverse, DeferredUpdates, FacetError, NodeRef, RenderFrame, Rendering, Simulation,
    SimulationStep,
};
use thiserror::Error;

/// Weight divisor of the exponential moving average of frame time
pub const FRAME_TIME_SMOOTHING: f64 = 20.0;

/// Errors reported by the main loop
#[derive(Error, Debug)]
pub enum LoopError {
    /// The loop was built without a root node
    #[error("A root node is mandatory")]
    MissingRoot,

    /// Loop options were out of range
    #[error("Invalid loop options: {0}")]
    InvalidOptions(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// A facet failed during a simulate or render pass
    #[error("Facet error: {0}")]
    Facet(#[from] FacetError),
}

/// What one frame did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Wall-clock time (ms) since the previous frame; 0 on the first one
    pub frame_time: f64,
    /// Number of simulate passes run
    pub simulated_chunks: u32,
    /// Value handed to the render pass
    pub interpolation: f64,
}

/// Counters accumulated since the loop was built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Frames completed, including steps
    pub frames: u64,
    /// Simulate passes completed
    pub chunks: u64,
    /// Frames whose simulated time was cut down to `max_simulation_time`
    pub clamped_frames: u64,
}

/// Fixed-timestep scheduler over a scene tree
pub struct MainLoop {
    root: NodeRef,
    options: LoopOptions,
    clock: Box<dyn Clock>,
    refresh: Box<dyn RefreshSignal>,
    updates: DeferredUpdates,
    running: bool,
    simulation_time: f64,
    accumulator: f64,
    last_time: Option<f64>,
    average_frame_time: f64,
    stats: LoopStats,
}

impl MainLoop {
    /// Start configuring a loop
    pub fn builder() -> LoopBuilder {
        LoopBuilder::new()
    }

    /// Start from simulated time 0 and request the first frame.
    ///
    /// Does nothing if the loop is already running.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.reset(0.0);
        self.resume();
    }

    /// Stop the loop and move simulated time to `offset` (ms).
    ///
    /// The accumulator is emptied and the wall-clock baseline forgotten, so
    /// the next frame measures no elapsed time.
    pub fn reset(&mut self, offset: f64) {
        self.pause();
        self.simulation_time = offset;
        self.accumulator = 0.0;
        self.last_time = None;
        log::info!("Loop reset to t={offset}ms");
    }

    /// Stop serving frames, keeping simulated time and the accumulator
    pub fn pause(&mut self) {
        if self.running {
            log::info!("Loop paused at t={}ms", self.simulation_time);
        }
        self.running = false;
    }

    /// Continue from the current simulated time.
    ///
    /// Wall-clock time spent paused is not simulated.
    pub fn resume(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_time = None;
        self.refresh.request_frame();
        log::info!("Loop running from t={}ms", self.simulation_time);
    }

    /// Run one frame iteration while stopped.
    ///
    /// Simulates `time_to_simulate` ms, still clamped to
    /// `max_simulation_time`. `None`, zero, negative and NaN values all
    /// simulate one `simulation_delta`. Returns `Ok(None)` without doing
    /// anything if the loop is running.
    pub fn step(&mut self, time_to_simulate: Option<f64>) -> Result<Option<FrameReport>, LoopError> {
        if self.running {
            log::debug!("Ignoring step while the loop is running");
            return Ok(None);
        }
        let forced = match time_to_simulate {
            Some(millis) if millis > 0.0 => millis,
            _ => self.options.simulation_delta,
        };
        self.run_frame(Some(forced)).map(Some)
    }

    /// Refresh callback: run one frame if the loop is running.
    ///
    /// The next frame is requested before any work is done. Facet errors
    /// are returned as is; the loop stays running and the host decides
    /// whether to pause it.
    pub fn frame(&mut self) -> Result<Option<FrameReport>, LoopError> {
        if !self.running {
            return Ok(None);
        }
        self.refresh.request_frame();
        self.run_frame(None).map(Some)
    }

    fn run_frame(&mut self, forced: Option<f64>) -> Result<FrameReport, LoopError> {
        let now = self.clock.now_ms();
        let frame_time = self.last_time.map_or(0.0, |last| (now - last).max(0.0));
        self.last_time = Some(now);
        self.average_frame_time += (frame_time - self.average_frame_time) / FRAME_TIME_SMOOTHING;

        let requested = forced.unwrap_or(frame_time);
        let time_to_simulate = requested.min(self.options.max_simulation_time);
        if requested > time_to_simulate {
            log::debug!(
                "Frame asked for {requested:.1}ms of simulation, clamped to {time_to_simulate:.1}ms"
            );
            self.stats.clamped_frames += 1;
        }
        self.accumulator += time_to_simulate;

        let mut simulated_chunks = 0;
        if self.options.is_coupled() {
            self.simulate_chunk(self.accumulator)?;
            simulated_chunks = 1;
        } else {
            let dt = self.options.simulation_delta;
            while self.accumulator >= dt {
                self.simulate_chunk(dt)?;
                simulated_chunks += 1;
            }
        }

        let interpolation = self.interpolation();
        traverse::<Rendering>(self.root.as_ref(), &RenderFrame { interpolation })?;
        self.stats.frames += 1;

        log::trace!(
            "Frame {}: {frame_time:.2}ms, {simulated_chunks} chunks, t={}ms, interpolation={interpolation:.3}",
            self.stats.frames,
            self.simulation_time
        );

        Ok(FrameReport {
            frame_time,
            simulated_chunks,
            interpolation,
        })
    }

    fn simulate_chunk(&mut self, dt: f64) -> Result<(), LoopError> {
        let step = SimulationStep {
            t: self.simulation_time,
            dt,
            updates: &self.updates,
        };
        if let Err(error) = traverse::<Simulation>(self.root.as_ref(), &step) {
            let dropped = self.updates.discard();
            log::warn!(
                "Simulate pass at t={}ms failed, discarded {dropped} staged updates: {error}",
                self.simulation_time
            );
            return Err(error.into());
        }

        self.updates.flush();
        self.simulation_time += dt;
        self.accumulator -= dt;
        self.stats.chunks += 1;
        Ok(())
    }

    /// Fraction of the next chunk already accumulated, in `[0, 1)`
    ///
    /// Always 0 in coupled mode.
    pub fn interpolation(&self) -> f64 {
        if self.options.is_coupled() {
            0.0
        } else {
            self.accumulator / self.options.simulation_delta
        }
    }

    /// Simulated time (ms) at the end of the last completed chunk
    pub fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    /// Wall-clock time (ms) accumulated but not yet simulated
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Smoothed frame time (ms)
    pub fn average_frame_time(&self) -> f64 {
        self.average_frame_time
    }

    /// Frame rate derived from the smoothed frame time; 0 before any measurement
    pub fn frames_per_second(&self) -> f64 {
        if self.average_frame_time > 0.0 {
            1000.0 / self.average_frame_time
        } else {
            0.0
        }
    }

    /// Whether frames are being served
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Root of the scene
    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    /// Options the loop was built with
    pub fn options(&self) -> &LoopOptions {
        &self.options
    }

    /// Counters since construction
    pub fn stats(&self) -> LoopStats {
        self.stats
    }
}

impl std::fmt::Debug for MainLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainLoop")
            .field("root", &self.root.id())
            .field("options", &self.options)
            .field("running", &self.running)
            .field("simulation_time", &self.simulation_time)
            .field("accumulator", &self.accumulator)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
