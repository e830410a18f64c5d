//! Lazy KdTree construction over a subtree

use super::{KdTree, KdTreeBuildOptions};
use crate::scene::{NodeId, NodeVisitor, SceneGraph, TraversalMode, VisitorState};

/// Builds a [`KdTree`] shape for every geometry that has none yet
///
/// Geometries whose build fails (point clouds, degenerate meshes) are left
/// without a shape and retried on the next run.
#[derive(Debug)]
pub struct KdTreeBuilder {
    state: VisitorState,
    options: KdTreeBuildOptions,
    built: usize,
    failed: usize,
}

impl KdTreeBuilder {
    /// Builder with default options
    pub fn new() -> Self {
        Self::with_options(KdTreeBuildOptions::default())
    }

    /// Builder with explicit options
    pub fn with_options(options: KdTreeBuildOptions) -> Self {
        Self {
            state: VisitorState::new(TraversalMode::AllChildren),
            options,
            built: 0,
            failed: 0,
        }
    }

    /// Build options
    pub fn options(&self) -> &KdTreeBuildOptions {
        &self.options
    }

    /// Shapes assigned since creation
    pub fn built_count(&self) -> usize {
        self.built
    }

    /// Geometries whose build failed since creation
    pub fn failed_count(&self) -> usize {
        self.failed
    }
}

impl Default for KdTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeVisitor for KdTreeBuilder {
    fn state(&self) -> &VisitorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut VisitorState {
        &mut self.state
    }

    fn apply(&mut self, graph: &mut SceneGraph, id: NodeId) {
        if let Some(node) = graph.node_mut(id) {
            if node.shape().is_none() {
                if let Some(geometry) = node.as_geometry() {
                    let mut tree = KdTree::new();
                    if tree.build(&self.options, geometry.triangle_list()) {
                        log::debug!(
                            "Built kdtree for {:?}: {} triangles, {} leaves",
                            node.name(),
                            tree.triangle_count(),
                            tree.leaf_count()
                        );
                        node.set_shape(tree);
                        self.built += 1;
                    } else {
                        self.failed += 1;
                    }
                }
            }
        }
        self.traverse(graph, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::scene::{Geometry, Node};

    fn quad() -> Geometry {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(1.0, 0.0, 0.0);
        let c = Vec3::new(1.0, 1.0, 0.0);
        let d = Vec3::new(0.0, 1.0, 0.0);
        Geometry::triangles(vec![a, b, c, a, c, d])
    }

    #[test]
    fn test_builds_each_shape_once() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(Node::group());
        let mesh = graph.add_node(Node::geometry(quad()));
        let hidden = graph.add_node(Node::geometry(quad()).with_node_mask(0));
        graph.add_child(root, mesh).unwrap();
        graph.add_child(root, hidden).unwrap();

        let mut builder = KdTreeBuilder::new();
        builder.run(&mut graph, root);
        assert_eq!(builder.built_count(), 2);
        assert!(graph.node(mesh).unwrap().shape().is_some());
        assert!(graph.node(hidden).unwrap().shape().is_some());

        let first = graph.node(mesh).unwrap().shape().unwrap().triangle_count();
        builder.run(&mut graph, root);
        assert_eq!(builder.built_count(), 2);
        assert_eq!(graph.node(mesh).unwrap().shape().unwrap().triangle_count(), first);
    }

    #[test]
    fn test_point_clouds_stay_unshaped() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(Node::group());
        let cloud = graph.add_node(Node::geometry(Geometry::points(vec![Vec3::zeros(), Vec3::x()])));
        let mesh = graph.add_node(Node::geometry(quad()));
        graph.add_child(root, cloud).unwrap();
        graph.add_child(cloud, mesh).unwrap();

        let mut builder = KdTreeBuilder::new();
        builder.run(&mut graph, root);
        assert!(graph.node(cloud).unwrap().shape().is_none());
        assert_eq!(builder.failed_count(), 1);
        // Failure on the parent does not stop the descent
        assert!(graph.node(mesh).unwrap().shape().is_some());
    }
}
