//! Arena-backed scene graph
//!
//! Nodes live in a slot map and refer to each other by [`NodeId`]. A node
//! may have several parents; the graph never lets a node become its own
//! ancestor. Nodes are only freed by [`SceneGraph::remove_node`].

use slotmap::SlotMap;

use super::{Node, NodeFragment, NodeKind, SceneError};
use crate::foundation::math::Mat4;
use crate::spatial::BoundingBox;

slotmap::new_key_type! {
    /// Handle to a node in a [`SceneGraph`]
    pub struct NodeId;
}

/// Storage for every node of a scene
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
    generation: u64,
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a detached node
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        node.children.clear();
        node.parents.clear();
        self.nodes.insert(node)
    }

    /// Node by handle
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Mutable node by handle
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// True if the handle refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph holds no node
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Counter bumped by every edge insertion or removal
    ///
    /// Lets callers holding handles found by a traversal notice that the
    /// structure changed since.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Every live node, in no particular order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut Node)> {
        self.nodes.iter_mut()
    }

    /// Children of `id`, empty for unknown handles
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Parents of `id`, empty for unknown handles
    pub fn parents(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |n| n.parents.as_slice())
    }

    /// `index`-th child, re-read on every call so callers can iterate while
    /// mutating other parts of the graph
    pub fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    /// `index`-th parent
    pub fn parent_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.parents(id).get(index).copied()
    }

    /// Append `child` under `parent`
    ///
    /// Adding the same child twice creates two edges, like in any DAG scene
    /// graph: the child is traversed once per edge.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::NodeNotFound(parent));
        }
        if !self.contains(child) {
            return Err(SceneError::NodeNotFound(child));
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(SceneError::WouldCreateCycle { parent, child });
        }
        self.nodes[parent].children.push(child);
        self.nodes[child].parents.push(parent);
        self.generation += 1;
        Ok(())
    }

    /// Remove one `parent -> child` edge; false if there was none
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(p) = self.nodes.get_mut(parent) else {
            return false;
        };
        let Some(pos) = p.children.iter().position(|&c| c == child) else {
            return false;
        };
        p.children.remove(pos);
        if let Some(c) = self.nodes.get_mut(child) {
            if let Some(pos) = c.parents.iter().position(|&q| q == parent) {
                c.parents.remove(pos);
            }
        }
        self.generation += 1;
        true
    }

    /// Remove a node and every edge touching it. Children stay in the arena
    /// (they may have other parents); orphaned ones can be removed in turn.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(id)?;
        for parent in &node.parents {
            if let Some(p) = self.nodes.get_mut(*parent) {
                p.children.retain(|&c| c != id);
            }
        }
        for child in &node.children {
            if let Some(c) = self.nodes.get_mut(*child) {
                c.parents.retain(|&p| p != id);
            }
        }
        self.generation += 1;
        Some(node)
    }

    /// True if `ancestor` reaches `node` through child edges
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut pending = vec![node];
        let mut seen = std::collections::HashSet::new();
        while let Some(current) = pending.pop() {
            for &parent in self.parents(current) {
                if parent == ancestor {
                    return true;
                }
                if seen.insert(parent) {
                    pending.push(parent);
                }
            }
        }
        false
    }

    /// Insert a loaded fragment, optionally under `parent`, and return the
    /// handle of its root
    pub fn attach_fragment(
        &mut self,
        parent: Option<NodeId>,
        fragment: NodeFragment,
    ) -> Result<NodeId, SceneError> {
        if let Some(parent) = parent {
            if !self.contains(parent) {
                return Err(SceneError::NodeNotFound(parent));
            }
        }
        let NodeFragment { node, children } = fragment;
        let root = self.add_node(node);
        for child in children {
            self.attach_fragment(Some(root), child)?;
        }
        if let Some(parent) = parent {
            self.add_child(parent, root)?;
        }
        Ok(root)
    }

    /// Handles of every node carrying `name`
    pub fn find_by_name(&self, name: &str) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.name() == Some(name))
            .map(|(id, _)| id)
            .collect()
    }

    /// Product of the transform matrices along `path` (root first)
    pub fn local_to_world(&self, path: &[NodeId]) -> Mat4 {
        path.iter()
            .filter_map(|&id| self.node(id).and_then(Node::matrix))
            .fold(Mat4::identity(), |acc, m| acc * m)
    }

    /// Bounds of the subtree rooted at `id`, in `id`'s parent space
    pub fn compute_bounding_box(&self, id: NodeId) -> BoundingBox {
        let Some(node) = self.node(id) else {
            return BoundingBox::empty();
        };
        let mut bounds = match node.kind() {
            NodeKind::Geometry(g) => *g.bounds(),
            _ => BoundingBox::empty(),
        };
        for &child in node.children() {
            bounds.expand_by_box(&self.compute_bounding_box(child));
        }
        match node.kind() {
            NodeKind::MatrixTransform(m) if bounds.valid() => transform_box(&bounds, m),
            _ => bounds,
        }
    }
}

fn transform_box(bounds: &BoundingBox, m: &Mat4) -> BoundingBox {
    use crate::foundation::math::{Mat4Ext, Vec3};
    let mut out = BoundingBox::empty();
    for corner in 0..8 {
        let p = Vec3::new(
            if corner & 1 == 0 { bounds.min.x } else { bounds.max.x },
            if corner & 2 == 0 { bounds.min.y } else { bounds.max.y },
            if corner & 4 == 0 { bounds.min.z } else { bounds.max.z },
        );
        out.expand_by_point(&m.transform_vec3(&p));
    }
    out
}
