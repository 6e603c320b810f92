//! # Loop and Application Configuration
//!
//! Settings structures for the frame loop and for applications hosting it.
//!
//! ## Configuration Categories
//!
//! - **Loop Options**: fixed step size and per-frame catch-up budget
//! - **App Config**: loop options plus logging and refresh pacing for a host
//!
//! All times are milliseconds, matching the units of the simulated clock.

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};

/// Default cap on wall-clock time converted into simulated time per frame
pub const DEFAULT_MAX_SIMULATION_TIME: f64 = 300.0;

/// Default fixed simulation step
pub const DEFAULT_SIMULATION_DELTA: f64 = 10.0;

/// Most fixed chunks a single frame may run.
///
/// Options whose `max_simulation_time / simulation_delta` exceeds this are
/// rejected. It also keeps every chunk large enough to shrink the
/// accumulator.
pub const MAX_CHUNKS_PER_FRAME: f64 = 10_000.0;

/// # Loop Options
///
/// Controls how wall-clock frame time is turned into simulation chunks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopOptions {
    /// Upper bound (ms) on frame time simulated in a single display refresh.
    ///
    /// Frames longer than this are clamped so a stall never turns into an
    /// ever-growing catch-up backlog.
    pub max_simulation_time: f64,
    /// Fixed chunk size (ms) for each simulate pass.
    ///
    /// Zero couples simulation to the display rate: one chunk per frame,
    /// sized to the clamped frame time.
    pub simulation_delta: f64,
}

impl LoopOptions {
    /// Create options with the default values
    pub const fn new() -> Self {
        Self {
            max_simulation_time: DEFAULT_MAX_SIMULATION_TIME,
            simulation_delta: DEFAULT_SIMULATION_DELTA,
        }
    }

    /// Set the per-frame simulation budget
    #[must_use]
    pub fn with_max_simulation_time(mut self, millis: f64) -> Self {
        self.max_simulation_time = millis;
        self
    }

    /// Set the fixed step size; zero selects coupled mode
    #[must_use]
    pub fn with_simulation_delta(mut self, millis: f64) -> Self {
        self.simulation_delta = millis;
        self
    }

    /// Whether simulation runs one chunk per frame instead of fixed steps
    pub fn is_coupled(&self) -> bool {
        self.simulation_delta == 0.0
    }

    /// Validate the options
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.max_simulation_time.is_finite() || self.max_simulation_time < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_simulation_time must be a finite, non-negative number of milliseconds (got {})",
                self.max_simulation_time
            )));
        }

        if !self.simulation_delta.is_finite() || self.simulation_delta < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "simulation_delta must be a finite, non-negative number of milliseconds (got {})",
                self.simulation_delta
            )));
        }

        if !self.is_coupled() {
            let chunks = self.max_simulation_time / self.simulation_delta;
            if chunks > MAX_CHUNKS_PER_FRAME {
                return Err(ConfigError::Invalid(format!(
                    "simulation_delta {}ms is too small for max_simulation_time {}ms: \
                     up to {chunks:.0} chunks per frame, at most {MAX_CHUNKS_PER_FRAME} allowed",
                    self.simulation_delta, self.max_simulation_time
                )));
            }
        }

        Ok(())
    }
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for LoopOptions {}

/// # Application Configuration
///
/// Top-level settings for a program driving a [`crate::MainLoop`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Fallback log filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// Display refresh rate emulated by the paced driver
    pub refresh_rate_hz: f64,
    /// Frame loop options
    #[serde(rename = "loop")]
    pub loop_options: LoopOptions,
}

impl AppConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            refresh_rate_hz: 60.0,
            loop_options: LoopOptions::default(),
        }
    }

    /// Set the loop options
    #[must_use]
    pub fn with_loop_options(mut self, options: LoopOptions) -> Self {
        self.loop_options = options;
        self
    }

    /// Set the fallback log level
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the refresh rate
    #[must_use]
    pub fn with_refresh_rate(mut self, hz: f64) -> Self {
        self.refresh_rate_hz = hz;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.loop_options.validate()?;

        if !self.refresh_rate_hz.is_finite() || self.refresh_rate_hz <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "refresh_rate_hz must be positive (got {})",
                self.refresh_rate_hz
            )));
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for AppConfig {}
