//! Depth-first scene traversal
//!
//! Both stages walk the tree the same way: pre-call on the node, then each
//! child in order, then the post-call on the node. Only the facet that is
//! called and the child list that is followed differ, and [`Stage`] names
//! those two choices.
//!
//! The scene must be a tree (or at least acyclic). Nodes reachable through
//! several parents are visited once per parent; cycles recurse forever.

use super::facet::{FacetResult, Phase, RenderFrame, SimulationStep};
use super::node::NodeId;
use std::rc::Rc;

/// Shared handle to any node in the scene
pub type NodeRef = Rc<dyn Traversable>;

/// Object-safe view of a node, independent of its model type
pub trait Traversable {
    /// Unique id of the node
    fn id(&self) -> NodeId;

    /// Run the simulate facet for one phase
    fn simulate(&self, _phase: Phase, _step: &SimulationStep<'_>) -> FacetResult {
        Ok(())
    }

    /// Run the render facet for one phase
    fn render(&self, _phase: Phase, _frame: &RenderFrame) -> FacetResult {
        Ok(())
    }

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
}

/// One kind of traversal
pub trait Stage {
    /// Arguments handed to every facet call of a pass
    type Args<'a>;

    /// Name used in logs
    const NAME: &'static str;

    /// Call the stage's facet of `node`
    fn call(node: &dyn Traversable, phase: Phase, args: &Self::Args<'_>) -> FacetResult;

    /// Children the stage descends into
    fn children(node: &dyn Traversable) -> Vec<NodeRef>;
}

/// Simulate stage marker
#[derive(Debug, Clone, Copy)]
pub enum Simulation {}

impl Stage for Simulation {
    type Args<'a> = SimulationStep<'a>;

    const NAME: &'static str = "simulate";

    fn call(node: &dyn Traversable, phase: Phase, step: &SimulationStep<'_>) -> FacetResult {
        node.simulate(phase, step)
    }

    fn children(node: &dyn Traversable) -> Vec<NodeRef> {
        node.simulate_children()
    }
}

/// Render stage marker
#[derive(Debug, Clone, Copy)]
pub enum Rendering {}

impl Rendering {
    /// Run another node's render facet from inside a render facet.
    ///
    /// Lets a node draw through a different node's behavior without that
    /// node being one of its children.
    pub fn delegate(node: &dyn Traversable, phase: Phase, frame: &RenderFrame) -> FacetResult {
        node.render(phase, frame)
    }
}

impl Stage for Rendering {
    type Args<'a> = RenderFrame;

    const NAME: &'static str = "render";

    fn call(node: &dyn Traversable, phase: Phase, frame: &RenderFrame) -> FacetResult {
        node.render(phase, frame)
    }

    fn children(node: &dyn Traversable) -> Vec<NodeRef> {
        node.render_children()
    }
}

/// Walk the subtree rooted at `node` for stage `S`.
///
/// The child list is read once, after the pre-call, so a pre-call may still
/// decide which children are visited. The first error stops the walk.
pub fn traverse<S: Stage>(node: &dyn Traversable, args: &S::Args<'_>) -> FacetResult {
    S::call(node, Phase::Pre, args)?;
    for child in S::children(node) {
        traverse::<S>(child.as_ref(), args)?;
    }
    S::call(node, Phase::Post, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::facet::{
        Behavior, FacetError, Render, RenderBehavior, SimulateBehavior, Simulator,
    };
    use crate::scene::node::{Group, Model, Node};
    use crate::scene::updates::DeferredUpdates;
    use std::cell::RefCell;

    type Trace = Rc<RefCell<Vec<String>>>;

    struct Named {
        name: &'static str,
        trace: Trace,
        kids: Vec<NodeRef>,
        render_kids: Option<Vec<NodeRef>>,
        value: i32,
    }

    impl Named {
        fn leaf(name: &'static str, trace: &Trace) -> Self {
            Self {
                name,
                trace: Rc::clone(trace),
                kids: Vec::new(),
                render_kids: None,
                value: 0,
            }
        }
    }

    struct Tracer;

    impl Simulator<Named> for Tracer {
        fn simulate(&mut self, node: &Node<Named>, _step: &SimulationStep<'_>) -> FacetResult {
            let model = node.model();
            model.trace.borrow_mut().push(format!("{}-pre", model.name));
            Ok(())
        }

        fn post_simulate(&mut self, node: &Node<Named>, _step: &SimulationStep<'_>) -> FacetResult {
            let model = node.model();
            model.trace.borrow_mut().push(format!("{}-post", model.name));
            Ok(())
        }
    }

    impl Render<Named> for Tracer {
        fn render(&mut self, node: &Node<Named>, _frame: &RenderFrame) -> FacetResult {
            let model = node.model();
            model.trace.borrow_mut().push(format!("{}-draw", model.name));
            Ok(())
        }
    }

    impl Model for Named {
        fn children(&self) -> Vec<NodeRef> {
            self.kids.clone()
        }

        fn render_children(&self) -> Vec<NodeRef> {
            self.render_kids.clone().unwrap_or_else(|| self.kids.clone())
        }

        fn simulator() -> Behavior<Self, Simulation> {
            SimulateBehavior::factory(|_id, _model: &Named| Tracer)
        }

        fn renderer() -> Behavior<Self, Rendering> {
            RenderBehavior::instance(Tracer)
        }
    }

    #[test]
    fn test_pre_children_post_order() {
        let trace: Trace = Rc::default();
        let b = Node::new(Named::leaf("b", &trace));
        let c = Node::new(Named::leaf("c", &trace));
        let mut root = Named::leaf("a", &trace);
        root.kids = vec![b as NodeRef, c as NodeRef];
        let a = Node::new(root);

        let updates = DeferredUpdates::new();
        let step = SimulationStep { t: 0.0, dt: 10.0, updates: &updates };
        traverse::<Simulation>(a.as_ref(), &step).unwrap();

        assert_eq!(
            *trace.borrow(),
            ["a-pre", "b-pre", "b-post", "c-pre", "c-post", "a-post"]
        );
    }

    #[test]
    fn test_render_follows_its_own_child_list() {
        let trace: Trace = Rc::default();
        let shown = Node::new(Named::leaf("shown", &trace));
        let hidden = Node::new(Named::leaf("hidden", &trace));
        let mut root = Named::leaf("root", &trace);
        root.kids = vec![shown.clone() as NodeRef, hidden as NodeRef];
        root.render_kids = Some(vec![shown as NodeRef]);
        let root = Node::new(root);

        traverse::<Rendering>(root.as_ref(), &RenderFrame { interpolation: 0.5 }).unwrap();
        assert_eq!(*trace.borrow(), ["root-draw", "shown-draw"]);

        trace.borrow_mut().clear();
        let updates = DeferredUpdates::new();
        let step = SimulationStep { t: 0.0, dt: 10.0, updates: &updates };
        traverse::<Simulation>(root.as_ref(), &step).unwrap();
        assert_eq!(trace.borrow().len(), 6);
    }

    #[test]
    fn test_deferred_writes_see_pre_pass_state() {
        struct Shift;
        impl Model for Shift {}

        let trace: Trace = Rc::default();
        let left = Node::new(Named::leaf("left", &trace));
        let right = Node::new(Named::leaf("right", &trace));
        left.model_mut().value = 1;
        right.model_mut().value = 2;

        // Swap the two values; each read must see the other's old value
        let (l, r) = (Rc::clone(&left), Rc::clone(&right));
        let swapper = Node::builder(Shift)
            .simulator(SimulateBehavior::function(move |_node: &Node<Shift>, step: &SimulationStep<'_>| {
                let from_right = r.model().value;
                let from_left = l.model().value;
                l.update(step.updates, move |model| model.value = from_right);
                r.update(step.updates, move |model| model.value = from_left);
                Ok(())
            }))
            .build();

        let root = Node::new(Group::with_children(vec![swapper as NodeRef]));
        let updates = DeferredUpdates::new();
        let step = SimulationStep { t: 0.0, dt: 10.0, updates: &updates };
        traverse::<Simulation>(root.as_ref(), &step).unwrap();

        assert_eq!(left.model().value, 1);
        assert_eq!(updates.flush(), 2);
        assert_eq!(left.model().value, 2);
        assert_eq!(right.model().value, 1);
    }

    #[test]
    fn test_error_stops_the_walk() {
        struct Broken;
        impl Model for Broken {
            fn simulator() -> Behavior<Self, Simulation> {
                SimulateBehavior::function(|_node: &Node<Broken>, _step: &SimulationStep<'_>| {
                    Err(FacetError::Custom("broken".into()))
                })
            }
        }

        let trace: Trace = Rc::default();
        let after = Node::new(Named::leaf("after", &trace));
        let root = Node::new(Group::with_children(vec![Node::new(Broken) as NodeRef, after as NodeRef]));

        let updates = DeferredUpdates::new();
        let step = SimulationStep { t: 0.0, dt: 10.0, updates: &updates };
        let result = traverse::<Simulation>(root.as_ref(), &step);

        assert!(matches!(result, Err(FacetError::Custom(message)) if message == "broken"));
        assert!(trace.borrow().is_empty());
    }

    #[test]
    fn test_delegate_runs_other_node_facet() {
        struct Proxy;
        impl Model for Proxy {}

        let trace: Trace = Rc::default();
        let target = Node::new(Named::leaf("target", &trace));
        let via = Rc::clone(&target);
        let proxy = Node::builder(Proxy)
            .renderer(RenderBehavior::function(move |_node: &Node<Proxy>, frame: &RenderFrame| {
                Rendering::delegate(via.as_ref(), Phase::Pre, frame)
            }))
            .build();

        traverse::<Rendering>(proxy.as_ref(), &RenderFrame { interpolation: 0.0 }).unwrap();
        assert_eq!(*trace.borrow(), ["target-draw"]);
        assert_eq!(Simulation::NAME, "simulate");
        assert_eq!(Rendering::NAME, "render");
    }
}
