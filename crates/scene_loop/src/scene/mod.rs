//! Scene tree: nodes, facets and traversal
//!
//! A scene is a tree of [`Node`]s. Each node carries a [`Model`] and two
//! facets, one for the simulate stage and one for the render stage. The
//! main loop walks the tree with [`traverse`] once per simulated chunk and
//! once per rendered frame.

pub mod facet;
pub mod node;
pub mod traverse;
pub mod updates;

pub use facet::{
    Behavior, Facet, FacetError, FacetFactory, FacetResult, NoopFacet, Phase, Render,
    RenderBehavior, RenderFacet, RenderFrame, SimulateBehavior, SimulationStep, Simulator,
    SimulatorFacet,
};
pub use node::{Group, Model, Node, NodeBuilder, NodeId};
pub use traverse::{traverse, NodeRef, Rendering, Simulation, Stage, Traversable};
pub use updates::{DeferredUpdates, Mutation};
