//! # Scene Loop
//!
//! A fixed-timestep frame loop for tree-structured scenes.
//!
//! ## Features
//!
//! - **Fixed Timestep**: simulation advances in constant chunks regardless of display rate
//! - **Spiral Guard**: per-frame catch-up is capped by `max_simulation_time`
//! - **Two-Phase Facets**: every node gets a pre-call and a post-call per pass
//! - **Deferred Updates**: writes staged during a pass apply once it is over
//! - **Node Events**: per-node emitters with wildcard listeners and proxying
//! - **Injected Host**: wall clock and refresh signal are replaceable for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_loop::prelude::*;
//!
//! struct Ball {
//!     height: f64,
//! }
//!
//! impl Model for Ball {
//!     fn simulator() -> Behavior<Self, Simulation> {
//!         SimulateBehavior::function(|node: &Node<Ball>, step: &SimulationStep<'_>| {
//!             let dt = step.dt;
//!             node.update(step.updates, move |ball| ball.height -= dt * 0.01);
//!             Ok(())
//!         })
//!     }
//! }
//!
//! fn main() -> Result<(), LoopError> {
//!     let driver = PacedDriver::new(60.0).with_frame_limit(120);
//!     let mut main_loop = LoopBuilder::new()
//!         .root(Node::new(Ball { height: 100.0 }))
//!         .refresh(driver.requests())
//!         .build()?;
//!
//!     main_loop.start();
//!     driver.run(&mut main_loop)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod driver;
pub mod events;
pub mod foundation;
pub mod scene;

mod engine;

pub use engine::{FrameReport, LoopBuilder, LoopError, LoopStats, MainLoop, FRAME_TIME_SMOOTHING};

/// Common imports for loop users
pub mod prelude {
    pub use crate::{
        core::config::{AppConfig, Config, LoopOptions},
        driver::{FrameRequests, PacedDriver, RefreshSignal},
        events::{Event, EventArg, EventEmitter, EventHandler, ListenerId, ANY_EVENT},
        foundation::time::{Clock, ManualClock, SystemClock},
        scene::{
            traverse, Behavior, DeferredUpdates, FacetError, FacetResult, Group, Model, Node,
            NodeId, NodeRef, Phase, Render, RenderBehavior, RenderFrame, Rendering,
            SimulateBehavior, Simulation, SimulationStep, Simulator, Traversable,
        },
        FrameReport, LoopBuilder, LoopError, LoopStats, MainLoop,
    };
}
