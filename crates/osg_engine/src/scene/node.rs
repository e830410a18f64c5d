//! Scene graph nodes

use super::{Geometry, NodeId};
use crate::animation::UpdateCallback;
use crate::foundation::math::Mat4;
use crate::spatial::KdTree;
use crate::state::StateSet;

/// Node mask with every bit set; visible to any traversal mask
pub const NODE_MASK_ALL: u32 = u32::MAX;

/// What a node is, beyond being a graph vertex
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Plain grouping node
    Group,
    /// Applies a local matrix to its subtree
    MatrixTransform(Mat4),
    /// Drawable leaf
    Geometry(Geometry),
}

/// A vertex of the scene graph
///
/// Edges are stored as handle lists owned by the [`SceneGraph`](super::SceneGraph);
/// build them with `SceneGraph::add_child`.
#[derive(Debug, Clone)]
pub struct Node {
    name: Option<String>,
    node_mask: u32,
    state_set: Option<StateSet>,
    kind: NodeKind,
    pub(super) children: Vec<NodeId>,
    pub(super) parents: Vec<NodeId>,
    shape: Option<KdTree>,
    update_callback: Option<UpdateCallback>,
}

impl Node {
    /// Create a node of the given kind
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: None,
            node_mask: NODE_MASK_ALL,
            state_set: None,
            kind,
            children: Vec::new(),
            parents: Vec::new(),
            shape: None,
            update_callback: None,
        }
    }

    /// Grouping node
    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    /// Transform node
    pub fn matrix_transform(matrix: Mat4) -> Self {
        Self::new(NodeKind::MatrixTransform(matrix))
    }

    /// Drawable leaf
    pub fn geometry(geometry: Geometry) -> Self {
        Self::new(NodeKind::Geometry(geometry))
    }

    /// Builder: set the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder: set the state set
    pub fn with_state_set(mut self, state_set: StateSet) -> Self {
        self.state_set = Some(state_set);
        self
    }

    /// Builder: set the node mask
    pub fn with_node_mask(mut self, mask: u32) -> Self {
        self.node_mask = mask;
        self
    }

    /// Builder: set the update callback
    pub fn with_update_callback(mut self, callback: UpdateCallback) -> Self {
        self.update_callback = Some(callback);
        self
    }

    /// Node name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Set the node name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Node mask tested against visitor traversal masks
    pub fn node_mask(&self) -> u32 {
        self.node_mask
    }

    /// Set the node mask
    pub fn set_node_mask(&mut self, mask: u32) {
        self.node_mask = mask;
    }

    /// Attached state set
    pub fn state_set(&self) -> Option<&StateSet> {
        self.state_set.as_ref()
    }

    /// State set, created on demand
    pub fn get_or_create_state_set(&mut self) -> &mut StateSet {
        self.state_set.get_or_insert_with(StateSet::new)
    }

    /// Kind of node
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Mutable kind
    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Local matrix of a transform node
    pub fn matrix(&self) -> Option<&Mat4> {
        match &self.kind {
            NodeKind::MatrixTransform(m) => Some(m),
            _ => None,
        }
    }

    /// Replace the local matrix; false if this is not a transform node
    pub fn set_matrix(&mut self, matrix: Mat4) -> bool {
        match &mut self.kind {
            NodeKind::MatrixTransform(m) => {
                *m = matrix;
                true
            }
            _ => false,
        }
    }

    /// Geometry of a drawable leaf
    pub fn as_geometry(&self) -> Option<&Geometry> {
        match &self.kind {
            NodeKind::Geometry(g) => Some(g),
            _ => None,
        }
    }

    /// Mutable geometry of a drawable leaf
    pub fn as_geometry_mut(&mut self) -> Option<&mut Geometry> {
        match &mut self.kind {
            NodeKind::Geometry(g) => Some(g),
            _ => None,
        }
    }

    /// Spatial index, once built
    pub fn shape(&self) -> Option<&KdTree> {
        self.shape.as_ref()
    }

    /// Assign the spatial index
    pub fn set_shape(&mut self, shape: KdTree) {
        self.shape = Some(shape);
    }

    /// Update callback
    pub fn update_callback(&self) -> Option<&UpdateCallback> {
        self.update_callback.as_ref()
    }

    /// Mutable update callback
    pub fn update_callback_mut(&mut self) -> Option<&mut UpdateCallback> {
        self.update_callback.as_mut()
    }

    /// Set the update callback
    pub fn set_update_callback(&mut self, callback: UpdateCallback) {
        self.update_callback = Some(callback);
    }

    /// Detach the update callback so it can run with access to the graph
    pub(crate) fn take_update_callback(&mut self) -> Option<UpdateCallback> {
        self.update_callback.take()
    }

    /// Child handles, in order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Parent handles
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }
}

/// Detached subtree produced by loaders and merged into a graph
///
/// Owned outright, so it can be built on a loader thread and handed over
/// whole.
#[derive(Debug, Clone)]
pub struct NodeFragment {
    /// Root of the subtree; its edge lists are ignored
    pub node: Node,
    /// Child subtrees
    pub children: Vec<NodeFragment>,
}

impl NodeFragment {
    /// Fragment with no children
    pub fn leaf(node: Node) -> Self {
        Self { node, children: Vec::new() }
    }

    /// Builder: append a child subtree
    pub fn with_child(mut self, child: NodeFragment) -> Self {
        self.children.push(child);
        self
    }

    /// Total number of nodes in the fragment
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(NodeFragment::node_count).sum::<usize>()
    }
}
