//! Facets: per-node behavior for one traversal stage
//!
//! A facet is called twice per visit, once before the node's children are
//! visited (the pre-call) and once after all of them (the post-call). Every
//! facet, whatever its shape, is reached through [`Facet::apply`]:
//!
//! - a plain function runs on the pre-call; its post-call is a no-op
//! - a two-phase object ([`Simulator`] / [`Render`]) gets both calls
//! - an absent behavior ([`Behavior::Noop`]) ignores both
//!
//! Facets declared through a [`Behavior::Factory`] are constructed once per
//! node, so each node can keep private facet state.

use super::node::{Node, NodeId};
use super::traverse::{Rendering, Simulation, Stage};
use super::updates::DeferredUpdates;
use thiserror::Error;

/// Result of a facet call
pub type FacetResult = Result<(), FacetError>;

/// Errors raised by facets during a traversal
#[derive(Error, Debug)]
pub enum FacetError {
    /// Failure reported by user behavior
    #[error("Facet error: {0}")]
    Custom(String),

    /// Model data was inconsistent
    #[error("Model error: {0}")]
    Model(String),

    /// A facet was re-entered while already running, e.g. by delegating to itself
    #[error("Facet of node {0} is already running")]
    Busy(NodeId),
}

/// Which of the two visits of a node is being made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before the node's children are visited
    Pre,
    /// After all of the node's children were visited
    Post,
}

impl Phase {
    /// Map an `is_post_call` flag to a phase
    pub const fn from_post_call(is_post_call: bool) -> Self {
        if is_post_call {
            Self::Post
        } else {
            Self::Pre
        }
    }

    /// Whether this is the post-call
    pub const fn is_post_call(self) -> bool {
        matches!(self, Self::Post)
    }
}

/// Arguments of one simulate pass
pub struct SimulationStep<'a> {
    /// Simulated time (ms) at the start of this chunk
    pub t: f64,
    /// Simulated time (ms) covered by this chunk
    pub dt: f64,
    /// Queue for writes that must wait until the pass is over
    pub updates: &'a DeferredUpdates,
}

impl SimulationStep<'_> {
    /// Stage a mutation to run once the whole pass has finished
    pub fn update<F>(&self, mutation: F)
    where
        F: FnOnce() + 'static,
    {
        self.updates.schedule(mutation);
    }
}

impl std::fmt::Debug for SimulationStep<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationStep")
            .field("t", &self.t)
            .field("dt", &self.dt)
            .field("pending_updates", &self.updates.len())
            .finish()
    }
}

/// Arguments of one render pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderFrame {
    /// Position in `[0, 1)` between the last simulated tick and the next one
    pub interpolation: f64,
}

/// Uniform dispatch contract shared by every facet shape
pub trait Facet<M, S: Stage> {
    /// Run the pre-call or post-call for `node`
    fn apply(&mut self, node: &Node<M>, phase: Phase, args: &S::Args<'_>) -> FacetResult;
}

/// Two-phase simulate behavior
///
/// Override either method; both default to doing nothing.
pub trait Simulator<M> {
    /// Pre-call: read the scene and stage writes through `step.update`
    fn simulate(&mut self, _node: &Node<M>, _step: &SimulationStep<'_>) -> FacetResult {
        Ok(())
    }

    /// Post-call, made after every descendant was simulated
    fn post_simulate(&mut self, _node: &Node<M>, _step: &SimulationStep<'_>) -> FacetResult {
        Ok(())
    }
}

/// Two-phase render behavior
///
/// Override either method; both default to doing nothing.
pub trait Render<M> {
    /// Pre-call
    fn render(&mut self, _node: &Node<M>, _frame: &RenderFrame) -> FacetResult {
        Ok(())
    }

    /// Post-call, made after every descendant was rendered
    fn post_render(&mut self, _node: &Node<M>, _frame: &RenderFrame) -> FacetResult {
        Ok(())
    }
}

/// Facet that ignores both calls
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFacet;

impl<M, S: Stage> Facet<M, S> for NoopFacet {
    fn apply(&mut self, _node: &Node<M>, _phase: Phase, _args: &S::Args<'_>) -> FacetResult {
        Ok(())
    }
}

/// Adapts a [`Simulator`] to the dispatch contract
#[derive(Debug, Default)]
pub struct SimulatorFacet<T>(pub T);

impl<M, T: Simulator<M>> Facet<M, Simulation> for SimulatorFacet<T> {
    fn apply(&mut self, node: &Node<M>, phase: Phase, step: &SimulationStep<'_>) -> FacetResult {
        match phase {
            Phase::Pre => self.0.simulate(node, step),
            Phase::Post => self.0.post_simulate(node, step),
        }
    }
}

/// Adapts a [`Render`] to the dispatch contract
#[derive(Debug, Default)]
pub struct RenderFacet<T>(pub T);

impl<M, T: Render<M>> Facet<M, Rendering> for RenderFacet<T> {
    fn apply(&mut self, node: &Node<M>, phase: Phase, frame: &RenderFrame) -> FacetResult {
        match phase {
            Phase::Pre => self.0.render(node, frame),
            Phase::Post => self.0.post_render(node, frame),
        }
    }
}

struct FnSimulate<F>(F);

impl<M, F> Facet<M, Simulation> for FnSimulate<F>
where
    F: FnMut(&Node<M>, &SimulationStep<'_>) -> FacetResult,
{
    fn apply(&mut self, node: &Node<M>, phase: Phase, step: &SimulationStep<'_>) -> FacetResult {
        match phase {
            Phase::Pre => (self.0)(node, step),
            Phase::Post => Ok(()),
        }
    }
}

struct FnRender<F>(F);

impl<M, F> Facet<M, Rendering> for FnRender<F>
where
    F: FnMut(&Node<M>, &RenderFrame) -> FacetResult,
{
    fn apply(&mut self, node: &Node<M>, phase: Phase, frame: &RenderFrame) -> FacetResult {
        match phase {
            Phase::Pre => (self.0)(node, frame),
            Phase::Post => Ok(()),
        }
    }
}

/// Constructor of a per-node facet, given the node id and its model
pub type FacetFactory<M, S> = Box<dyn FnOnce(NodeId, &M) -> Box<dyn Facet<M, S>>>;

/// How a node behaves during one stage
///
/// Resolved into exactly one facet instance when the node is built.
pub enum Behavior<M, S: Stage> {
    /// No behavior; both calls are no-ops
    Noop,
    /// A plain function, called on the pre-call only
    Function(Box<dyn Facet<M, S>>),
    /// A ready-made facet used as is
    Instance(Box<dyn Facet<M, S>>),
    /// A facet constructed for each node from the node's id and model
    Factory(FacetFactory<M, S>),
}

/// Simulate behavior of nodes with model `M`
pub type SimulateBehavior<M> = Behavior<M, Simulation>;

/// Render behavior of nodes with model `M`
pub type RenderBehavior<M> = Behavior<M, Rendering>;

impl<M: 'static, S: Stage + 'static> Behavior<M, S> {
    /// Wrap any facet implementing the dispatch contract directly
    pub fn custom<F>(facet: F) -> Self
    where
        F: Facet<M, S> + 'static,
    {
        Self::Instance(Box::new(facet))
    }

    /// Produce the facet instance for a node under construction
    pub fn resolve(self, id: NodeId, model: &M) -> Box<dyn Facet<M, S>> {
        match self {
            Self::Noop => Box::new(NoopFacet),
            Self::Function(facet) | Self::Instance(facet) => facet,
            Self::Factory(factory) => factory(id, model),
        }
    }

    /// Whether the behavior does nothing
    pub const fn is_noop(&self) -> bool {
        matches!(self, Self::Noop)
    }
}

impl<M: 'static> Behavior<M, Simulation> {
    /// Plain simulate function; the post-call does nothing
    pub fn function<F>(f: F) -> Self
    where
        F: FnMut(&Node<M>, &SimulationStep<'_>) -> FacetResult + 'static,
    {
        Self::Function(Box::new(FnSimulate(f)))
    }

    /// Use one two-phase simulator instance
    pub fn instance<T>(simulator: T) -> Self
    where
        T: Simulator<M> + 'static,
    {
        Self::Instance(Box::new(SimulatorFacet(simulator)))
    }

    /// Build a fresh simulator for every node
    pub fn factory<T, F>(build: F) -> Self
    where
        T: Simulator<M> + 'static,
        F: FnOnce(NodeId, &M) -> T + 'static,
    {
        Self::Factory(Box::new(move |id: NodeId, model: &M| {
            Box::new(SimulatorFacet(build(id, model))) as Box<dyn Facet<M, Simulation>>
        }))
    }
}

impl<M: 'static> Behavior<M, Rendering> {
    /// Plain render function; the post-call does nothing
    pub fn function<F>(f: F) -> Self
    where
        F: FnMut(&Node<M>, &RenderFrame) -> FacetResult + 'static,
    {
        Self::Function(Box::new(FnRender(f)))
    }

    /// Use one two-phase render instance
    pub fn instance<T>(render: T) -> Self
    where
        T: Render<M> + 'static,
    {
        Self::Instance(Box::new(RenderFacet(render)))
    }

    /// Build a fresh render for every node
    pub fn factory<T, F>(build: F) -> Self
    where
        T: Render<M> + 'static,
        F: FnOnce(NodeId, &M) -> T + 'static,
    {
        Self::Factory(Box::new(move |id: NodeId, model: &M| {
            Box::new(RenderFacet(build(id, model))) as Box<dyn Facet<M, Rendering>>
        }))
    }
}

impl<M, S: Stage> Default for Behavior<M, S> {
    fn default() -> Self {
        Self::Noop
    }
}

impl<M, S: Stage> std::fmt::Debug for Behavior<M, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Noop => "Noop",
            Self::Function(_) => "Function",
            Self::Instance(_) => "Instance",
            Self::Factory(_) => "Factory",
        };
        write!(f, "Behavior::{kind}({})", S::NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::node::Model;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Probe;

    impl Model for Probe {}

    struct PhaseLog {
        calls: Rc<RefCell<Vec<(&'static str, f64)>>>,
    }

    impl Simulator<Probe> for PhaseLog {
        fn simulate(&mut self, _node: &Node<Probe>, step: &SimulationStep<'_>) -> FacetResult {
            self.calls.borrow_mut().push(("simulate", step.t));
            Ok(())
        }

        fn post_simulate(&mut self, _node: &Node<Probe>, step: &SimulationStep<'_>) -> FacetResult {
            self.calls.borrow_mut().push(("post_simulate", step.t));
            Ok(())
        }
    }

    impl Render<Probe> for PhaseLog {
        fn post_render(&mut self, _node: &Node<Probe>, frame: &RenderFrame) -> FacetResult {
            self.calls.borrow_mut().push(("post_render", frame.interpolation));
            Ok(())
        }
    }

    #[test]
    fn test_phase_flag_mapping() {
        assert_eq!(Phase::from_post_call(false), Phase::Pre);
        assert_eq!(Phase::from_post_call(true), Phase::Post);
        assert!(Phase::Post.is_post_call());
        assert!(!Phase::Pre.is_post_call());
    }

    #[test]
    fn test_two_phase_simulator_routes_by_phase() {
        let node = Node::new(Probe);
        let updates = DeferredUpdates::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut facet = SimulatorFacet(PhaseLog { calls: Rc::clone(&calls) });

        let step = SimulationStep { t: 40.0, dt: 10.0, updates: &updates };
        facet.apply(&node, Phase::Pre, &step).unwrap();
        facet.apply(&node, Phase::Post, &step).unwrap();

        assert_eq!(*calls.borrow(), [("simulate", 40.0), ("post_simulate", 40.0)]);
    }

    #[test]
    fn test_render_defaults_are_noops() {
        let node = Node::new(Probe);
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut facet = RenderFacet(PhaseLog { calls: Rc::clone(&calls) });
        let frame = RenderFrame { interpolation: 0.25 };

        facet.apply(&node, Phase::Pre, &frame).unwrap();
        facet.apply(&node, Phase::Post, &frame).unwrap();

        assert_eq!(*calls.borrow(), [("post_render", 0.25)]);
    }

    #[test]
    fn test_plain_function_has_noop_post_call() {
        let node = Node::new(Probe);
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let mut facet = Behavior::<Probe, Rendering>::function(move |_node, _frame| {
            *counter.borrow_mut() += 1;
            Ok(())
        })
        .resolve(node.id(), &Probe);

        let frame = RenderFrame { interpolation: 0.0 };
        facet.apply(&node, Phase::Pre, &frame).unwrap();
        facet.apply(&node, Phase::Post, &frame).unwrap();

        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_noop_behavior_accepts_both_phases() {
        let node = Node::new(Probe);
        let updates = DeferredUpdates::new();
        let mut facet = Behavior::<Probe, Simulation>::Noop.resolve(node.id(), &Probe);
        let step = SimulationStep { t: 0.0, dt: 10.0, updates: &updates };

        assert!(facet.apply(&node, Phase::Pre, &step).is_ok());
        assert!(facet.apply(&node, Phase::Post, &step).is_ok());
        assert!(updates.is_empty());
    }

    #[test]
    fn test_factory_receives_id_and_model() {
        struct Seeded;
        impl Simulator<Probe> for Seeded {}

        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        let behavior = Behavior::<Probe, Simulation>::factory(move |id, _model: &Probe| {
            *sink.borrow_mut() = Some(id);
            Seeded
        });
        assert!(format!("{behavior:?}").contains("Factory"));

        let id = NodeId::next();
        let _facet = behavior.resolve(id, &Probe);
        assert_eq!(*seen.borrow(), Some(id));
    }
}
