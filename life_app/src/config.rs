//! Demo configuration

use scene_loop::core::config::{AppConfig, Config, ConfigError};
use serde::{Deserialize, Serialize};

/// Full configuration of the demo, as read from a TOML or RON file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LifeConfig {
    /// Host settings (logging, refresh rate, loop options)
    pub app: AppConfig,
    /// Board settings
    pub board: BoardSettings,
}

impl Config for LifeConfig {}

impl LifeConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.app.validate()?;
        self.board.validate()
    }
}

/// Board settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    /// Number of rows
    pub rows: usize,
    /// Number of columns
    pub cols: usize,
    /// Simulated time (ms) between two generations
    pub generation_ms: f64,
    /// Seed of the initial fill
    pub seed: u64,
    /// Probability of a cell starting alive
    pub density: f64,
    /// Turn the outer ring into inert fossil cells
    pub fossil_border: bool,
    /// Stop after this many frames; 0 runs until interrupted
    pub max_frames: u64,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            rows: 16,
            cols: 40,
            generation_ms: 250.0,
            seed: 7,
            density: 0.3,
            fossil_border: false,
            max_frames: 600,
        }
    }
}

impl BoardSettings {
    /// Validate board settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows < 3 || self.cols < 3 {
            return Err(ConfigError::Invalid(format!(
                "board must be at least 3x3 (got {}x{})",
                self.rows, self.cols
            )));
        }
        if !self.generation_ms.is_finite() || self.generation_ms <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "generation_ms must be positive (got {})",
                self.generation_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.density) {
            return Err(ConfigError::Invalid(format!(
                "density must be between 0 and 1 (got {})",
                self.density
            )));
        }
        Ok(())
    }
}
