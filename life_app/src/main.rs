//! Game of Life demo
//!
//! Runs a toroidal Game of Life board through the scene loop and prints it
//! to the terminal. Pass a `.toml` or `.ron` file to override the defaults:
//!
//! ```text
//! life [config-file]
//! ```

mod board;
mod canvas;
mod cell;
mod config;

use board::Board;
use config::LifeConfig;
use scene_loop::core::config::{Config, ConfigError};
use scene_loop::driver::PacedDriver;
use scene_loop::foundation::logging;
use scene_loop::{LoopBuilder, LoopError};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Loop(#[from] LoopError),
}

fn main() -> Result<(), AppError> {
    let config = match std::env::args().nth(1) {
        Some(path) => LifeConfig::load_from_file(&path)?,
        None => LifeConfig::default(),
    };
    logging::init_with_level(&config.app.log_level);
    config.validate()?;

    let board = Board::build(&config.board, Rc::new(RefCell::new(std::io::stdout())));

    let mut driver = PacedDriver::new(config.app.refresh_rate_hz);
    if config.board.max_frames > 0 {
        driver = driver.with_frame_limit(config.board.max_frames);
    }

    let mut main_loop = LoopBuilder::new()
        .root(board.clone())
        .options(config.app.loop_options)
        .refresh(driver.requests())
        .build()?;

    main_loop.start();
    let frames = driver.run(&mut main_loop)?;

    let model = board.model();
    let census = model.census();
    log::info!(
        "Stopped after {} frames: generation {}, t={}ms, {:.1} fps, {} births, {} deaths",
        frames,
        model.generation(),
        main_loop.simulation_time(),
        main_loop.frames_per_second(),
        census.births,
        census.deaths
    );
    Ok(())
}
