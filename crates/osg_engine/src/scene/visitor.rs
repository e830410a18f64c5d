//! Scene graph traversal
//!
//! A visitor owns a [`VisitorState`] and overrides [`NodeVisitor::apply`] to
//! act on each node. The provided methods maintain the node path and walk the
//! graph depth-first in pre-order: a node reached through several parents is
//! visited once per path.

use super::{NodeId, SceneGraph};

/// Which edges a traversal follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalMode {
    /// Walk upwards to the roots
    Parents,
    /// Visit every child regardless of masks
    AllChildren,
    /// Visit children whose node mask matches the traversal mask
    ActiveChildren,
}

/// Traversal bookkeeping shared by every visitor
#[derive(Debug, Clone)]
pub struct VisitorState {
    /// Edge direction and filtering
    pub mode: TraversalMode,
    /// Bits a child's node mask must share to be visited
    pub traversal_mask: u32,
    /// Bits treated as set in every node mask
    pub node_mask_override: u32,
    node_path: Vec<NodeId>,
    active: bool,
}

impl VisitorState {
    /// State for a traversal in `mode` with every mask bit enabled
    pub fn new(mode: TraversalMode) -> Self {
        Self {
            mode,
            traversal_mask: u32::MAX,
            node_mask_override: 0,
            node_path: Vec::new(),
            active: false,
        }
    }

    /// Builder: set the traversal mask
    pub fn with_traversal_mask(mut self, mask: u32) -> Self {
        self.traversal_mask = mask;
        self
    }

    /// Nodes from the traversal root to the current node; always empty in
    /// [`TraversalMode::Parents`]
    pub fn node_path(&self) -> &[NodeId] {
        &self.node_path
    }

    /// True while `run` is on the stack
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True if a node with `node_mask` passes the mask test
    pub fn valid_node_mask(&self, node_mask: u32) -> bool {
        self.traversal_mask & (self.node_mask_override | node_mask) != 0
    }

    // Walking towards the roots leaves the path untouched
    fn push(&mut self, id: NodeId) {
        if self.mode != TraversalMode::Parents {
            self.node_path.push(id);
        }
    }

    fn pop(&mut self) {
        if self.mode != TraversalMode::Parents {
            self.node_path.pop();
        }
    }
}

/// Double-dispatch traversal over a [`SceneGraph`]
pub trait NodeVisitor {
    /// Traversal bookkeeping
    fn state(&self) -> &VisitorState;

    /// Mutable traversal bookkeeping
    fn state_mut(&mut self) -> &mut VisitorState;

    /// Per-node work; continue with [`NodeVisitor::traverse`] to descend
    fn apply(&mut self, graph: &mut SceneGraph, id: NodeId) {
        self.traverse(graph, id);
    }

    /// Visit the next nodes according to the traversal mode
    ///
    /// Edges are re-read by index on every step, so `apply` may edit the
    /// graph without invalidating the walk.
    fn traverse(&mut self, graph: &mut SceneGraph, id: NodeId) {
        let mode = self.state().mode;
        let mut index = 0;
        loop {
            let next = match mode {
                TraversalMode::Parents => graph.parent_at(id, index),
                TraversalMode::AllChildren | TraversalMode::ActiveChildren => graph.child_at(id, index),
            };
            let Some(next) = next else {
                break;
            };
            index += 1;

            if mode == TraversalMode::ActiveChildren {
                let mask = graph.node(next).map_or(0, |n| n.node_mask());
                if !self.state().valid_node_mask(mask) {
                    continue;
                }
            }
            self.accept(graph, next);
        }
    }

    /// Enter `id`: extend the node path, apply, restore the path
    fn accept(&mut self, graph: &mut SceneGraph, id: NodeId) {
        self.state_mut().push(id);
        self.apply(graph, id);
        self.state_mut().pop();
    }

    /// Start a traversal at `root`
    ///
    /// # Panics
    ///
    /// Panics if the visitor is already running.
    fn run(&mut self, graph: &mut SceneGraph, root: NodeId) {
        assert!(!self.state().active, "node visitor is not reentrant");
        let state = self.state_mut();
        state.active = true;
        state.node_path.clear();
        self.accept(graph, root);
        self.state_mut().active = false;
    }
}
