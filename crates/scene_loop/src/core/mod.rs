//! # Core Module
//!
//! Shared settings used by the loop and by host applications.

pub mod config;

pub use config::{
    AppConfig,
    Config,
    ConfigError,
    LoopOptions,
    DEFAULT_MAX_SIMULATION_TIME,
    DEFAULT_SIMULATION_DELTA,
};
