//! Scene nodes
//!
//! A [`Node`] wraps user data (a [`Model`]) together with the two facets
//! that drive it and an event emitter. Nodes are always handed out as
//! `Rc<Node<M>>`; the tree itself is whatever each model's child accessors
//! return, as [`NodeRef`]s.

use super::facet::{Behavior, Facet, FacetError, FacetResult, Phase, RenderFrame, SimulationStep};
use super::traverse::{NodeRef, Rendering, Simulation, Traversable};
use super::updates::DeferredUpdates;
use crate::events::EventEmitter;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identifier
///
/// Ids are handed out in increasing order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Allocate the next id
    pub fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// User data carried by a node
///
/// The associated functions declare the behavior every node of this type
/// gets. They are evaluated once per node at construction, so a
/// [`Behavior::Factory`] yields a separate facet instance for each node.
pub trait Model: 'static {
    /// Children visited by every stage
    fn children(&self) -> Vec<NodeRef> {
        Vec::new()
    }

    /// Children visited by simulate passes
    fn simulate_children(&self) -> Vec<NodeRef> {
        self.children()
    }

    /// Children visited by render passes
    fn render_children(&self) -> Vec<NodeRef> {
        self.children()
    }

    /// Simulate behavior for nodes of this type
    fn simulator() -> Behavior<Self, Simulation>
    where
        Self: Sized,
    {
        Behavior::Noop
    }

    /// Render behavior for nodes of this type
    fn renderer() -> Behavior<Self, Rendering>
    where
        Self: Sized,
    {
        Behavior::Noop
    }
}

/// Model that only groups other nodes
#[derive(Default)]
pub struct Group {
    children: Vec<NodeRef>,
}

impl Group {
    /// Create an empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group from existing nodes
    pub fn with_children(children: Vec<NodeRef>) -> Self {
        Self { children }
    }

    /// Append a child
    pub fn push(&mut self, child: NodeRef) {
        self.children.push(child);
    }

    /// Remove the child with the given id, returning whether it was present
    pub fn remove(&mut self, id: NodeId) -> bool {
        let before = self.children.len();
        self.children.retain(|child| child.id() != id);
        self.children.len() != before
    }

    /// Number of direct children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the group has no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Model for Group {
    fn children(&self) -> Vec<NodeRef> {
        self.children.clone()
    }
}

/// A scene node: model, facets and events
pub struct Node<M> {
    id: NodeId,
    model: RefCell<M>,
    simulator: RefCell<Box<dyn Facet<M, Simulation>>>,
    renderer: RefCell<Box<dyn Facet<M, Rendering>>>,
    events: EventEmitter,
    this: Weak<Node<M>>,
}

impl<M: Model> Node<M> {
    /// Build a node with the behavior declared by `M`
    pub fn new(model: M) -> Rc<Self> {
        NodeBuilder::new(model).build()
    }

    /// Start building a node whose behavior can be overridden
    pub fn builder(model: M) -> NodeBuilder<M> {
        NodeBuilder::new(model)
    }

    /// Unique id of this node
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Borrow the model
    ///
    /// # Panics
    ///
    /// Panics if the model is currently borrowed mutably.
    pub fn model(&self) -> Ref<'_, M> {
        self.model.borrow()
    }

    /// Borrow the model mutably
    ///
    /// Prefer [`Node::update`] from simulate facets so writes wait until
    /// the pass is over.
    ///
    /// # Panics
    ///
    /// Panics if the model is currently borrowed.
    pub fn model_mut(&self) -> RefMut<'_, M> {
        self.model.borrow_mut()
    }

    /// Event emitter of this node
    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// Owning handle to this node
    ///
    /// Only `None` while the node is being dropped.
    pub fn handle(&self) -> Option<Rc<Self>> {
        self.this.upgrade()
    }

    /// Stage a write to this node's model, applied after the current pass
    pub fn update<F>(&self, updates: &DeferredUpdates, mutate: F)
    where
        F: FnOnce(&mut M) + 'static,
    {
        if let Some(node) = self.handle() {
            updates.schedule(move || mutate(&mut node.model.borrow_mut()));
        }
    }
}

impl<M: Model> Traversable for Node<M> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn simulate(&self, phase: Phase, step: &SimulationStep<'_>) -> FacetResult {
        let mut facet = self
            .simulator
            .try_borrow_mut()
            .map_err(|_| FacetError::Busy(self.id))?;
        facet.apply(self, phase, step)
    }

    fn render(&self, phase: Phase, frame: &RenderFrame) -> FacetResult {
        let mut facet = self
            .renderer
            .try_borrow_mut()
            .map_err(|_| FacetError::Busy(self.id))?;
        facet.apply(self, phase, frame)
    }

    fn simulate_children(&self) -> Vec<NodeRef> {
        self.model.borrow().simulate_children()
    }

    fn render_children(&self) -> Vec<NodeRef> {
        self.model.borrow().render_children()
    }
}

impl<M> fmt::Debug for Node<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("model", &std::any::type_name::<M>())
            .finish_non_exhaustive()
    }
}

/// Builder for nodes that override the behavior declared by their model type
pub struct NodeBuilder<M> {
    model: M,
    simulator: Option<Behavior<M, Simulation>>,
    renderer: Option<Behavior<M, Rendering>>,
}

impl<M: Model> NodeBuilder<M> {
    /// Start from a model value
    pub fn new(model: M) -> Self {
        Self {
            model,
            simulator: None,
            renderer: None,
        }
    }

    /// Replace the type-level simulate behavior for this node only
    #[must_use]
    pub fn simulator(mut self, behavior: Behavior<M, Simulation>) -> Self {
        self.simulator = Some(behavior);
        self
    }

    /// Replace the type-level render behavior for this node only
    #[must_use]
    pub fn renderer(mut self, behavior: Behavior<M, Rendering>) -> Self {
        self.renderer = Some(behavior);
        self
    }

    /// Allocate the id, resolve both facets and create the node
    pub fn build(self) -> Rc<Node<M>> {
        let Self {
            model,
            simulator,
            renderer,
        } = self;
        let id = NodeId::next();
        let simulator = simulator.unwrap_or_else(M::simulator).resolve(id, &model);
        let renderer = renderer.unwrap_or_else(M::renderer).resolve(id, &model);

        Rc::new_cyclic(|this| Node {
            id,
            model: RefCell::new(model),
            simulator: RefCell::new(simulator),
            renderer: RefCell::new(renderer),
            events: EventEmitter::new(id),
            this: this.clone(),
        })
    }
}
