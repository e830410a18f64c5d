//! Cull traversal
//!
//! Accumulates model-view matrices in the pass arena, records which nodes
//! contribute state sets, and keeps every geometry whose bounds intersect the
//! view frustum as a [`RenderLeaf`].

use crate::foundation::math::Mat4;
use crate::foundation::memory::{MatrixMemoryPool, MatrixSlot};
use crate::scene::{NodeId, NodeVisitor, SceneGraph, TraversalMode, VisitorState};
use crate::spatial::Frustum;

/// One visible geometry and everything needed to draw it
#[derive(Debug, Clone)]
pub struct RenderLeaf {
    /// Geometry node
    pub node: NodeId,
    /// Model-view matrix in the cull pass arena
    pub model_view: MatrixSlot,
    /// Nodes whose state sets apply, outermost first
    pub state_sets: Vec<NodeId>,
}

/// Builds the render leaves of one frame
#[derive(Debug)]
pub struct CullVisitor {
    state: VisitorState,
    pool: MatrixMemoryPool,
    model_views: Vec<MatrixSlot>,
    state_set_path: Vec<NodeId>,
    frustum: Frustum,
    projection: Mat4,
    leaves: Vec<RenderLeaf>,
    culled: usize,
}

impl CullVisitor {
    /// Cull visitor whose arena starts with `pool_size` matrices
    pub fn new(pool_size: usize) -> Self {
        let projection = Mat4::identity();
        Self {
            state: VisitorState::new(TraversalMode::ActiveChildren),
            pool: MatrixMemoryPool::new(pool_size),
            model_views: Vec::new(),
            state_set_path: Vec::new(),
            frustum: Frustum::from_matrix(&projection),
            projection,
            leaves: Vec::new(),
            culled: 0,
        }
    }

    /// Builder: only descend into children matching `mask`
    pub fn with_traversal_mask(mut self, mask: u32) -> Self {
        self.state.traversal_mask = mask;
        self
    }

    /// Start a new pass with the given camera
    ///
    /// Leaves and matrix slots of the previous pass become invalid.
    pub fn reset(&mut self, view: &Mat4, projection: &Mat4) {
        self.pool.reset();
        self.model_views.clear();
        self.model_views.push(self.pool.get_with(*view));
        self.state_set_path.clear();
        self.leaves.clear();
        self.culled = 0;
        self.projection = *projection;
        // Planes in view space, where the model-view matrices leave the bounds
        self.frustum = Frustum::from_matrix(projection);
    }

    /// Leaves collected by the last pass, in traversal order
    pub fn leaves(&self) -> &[RenderLeaf] {
        &self.leaves
    }

    /// Model-view matrix of `leaf`
    pub fn model_view(&self, leaf: &RenderLeaf) -> &Mat4 {
        self.pool.slot(leaf.model_view)
    }

    /// Projection of the last pass
    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// Geometries rejected by the frustum test in the last pass
    pub fn culled_count(&self) -> usize {
        self.culled
    }

    /// The pass arena
    pub fn pool(&self) -> &MatrixMemoryPool {
        &self.pool
    }

    fn current_model_view(&mut self) -> MatrixSlot {
        match self.model_views.last() {
            Some(&slot) => slot,
            None => {
                // `run` without `reset`: fall back to an identity camera
                let slot = self.pool.get_with(Mat4::identity());
                self.model_views.push(slot);
                slot
            }
        }
    }
}

impl NodeVisitor for CullVisitor {
    fn state(&self) -> &VisitorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut VisitorState {
        &mut self.state
    }

    fn apply(&mut self, graph: &mut SceneGraph, id: NodeId) {
        let Some(node) = graph.node(id) else {
            return;
        };
        let has_state_set = node.state_set().is_some_and(|s| !s.is_empty());
        let local = node.matrix().copied();
        let sphere = node.as_geometry().map(|g| g.bounds().sphere());

        if has_state_set {
            self.state_set_path.push(id);
        }

        let parent = self.current_model_view();
        if let Some(local) = local {
            let model_view = self.pool.slot(parent) * local;
            let slot = self.pool.get_with(model_view);
            self.model_views.push(slot);
        }

        if let Some(sphere) = sphere {
            let top = self.current_model_view();
            let view_sphere = sphere.transformed(self.pool.slot(top));
            if self.frustum.contains_sphere(&view_sphere) {
                self.leaves.push(RenderLeaf {
                    node: id,
                    model_view: top,
                    state_sets: self.state_set_path.clone(),
                });
            } else {
                self.culled += 1;
            }
        }

        self.traverse(graph, id);

        if local.is_some() {
            self.model_views.pop();
        }
        if has_state_set {
            self.state_set_path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4Ext, Vec3};
    use crate::scene::{Geometry, Node};
    use crate::state::{StateAttribute, StateSet};
    use approx::assert_relative_eq;

    fn camera() -> (Mat4, Mat4) {
        let view = Mat4::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y());
        let projection = Mat4::perspective(std::f32::consts::FRAC_PI_3, 1.0, 0.1, 100.0);
        (view, projection)
    }

    fn triangle() -> Node {
        Node::geometry(Geometry::triangles(vec![
            Vec3::new(-0.5, -0.5, 0.0),
            Vec3::new(0.5, -0.5, 0.0),
            Vec3::new(0.0, 0.5, 0.0),
        ]))
    }

    #[test]
    fn test_geometry_behind_camera_is_culled() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(Node::group());
        let visible = graph.add_node(triangle());
        let behind = graph.add_node(Node::matrix_transform(Mat4::translation(0.0, 0.0, 10.0)));
        let hidden = graph.add_node(triangle());
        graph.add_child(root, visible).unwrap();
        graph.add_child(root, behind).unwrap();
        graph.add_child(behind, hidden).unwrap();

        let (view, projection) = camera();
        let mut cull = CullVisitor::new(4);
        cull.reset(&view, &projection);
        cull.run(&mut graph, root);

        assert_eq!(cull.leaves().len(), 1);
        assert_eq!(cull.leaves()[0].node, visible);
        assert_eq!(cull.culled_count(), 1);
    }

    #[test]
    fn test_model_view_accumulates_transforms() {
        let mut graph = SceneGraph::new();
        let outer = graph.add_node(Node::matrix_transform(Mat4::translation(1.0, 0.0, 0.0)));
        let inner = graph.add_node(Node::matrix_transform(Mat4::scaling(2.0, 2.0, 2.0)));
        let leaf = graph.add_node(triangle());
        graph.add_child(outer, inner).unwrap();
        graph.add_child(inner, leaf).unwrap();

        let (view, projection) = camera();
        let mut cull = CullVisitor::new(0);
        cull.reset(&view, &projection);
        cull.run(&mut graph, outer);

        let expected = view * Mat4::translation(1.0, 0.0, 0.0) * Mat4::scaling(2.0, 2.0, 2.0);
        assert_relative_eq!(*cull.model_view(&cull.leaves()[0]), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_state_set_path_and_mask() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(
            Node::group().with_state_set(StateSet::new().with_attribute(StateAttribute::PointSize(3.0))),
        );
        let plain = graph.add_node(Node::group());
        let leaf = graph.add_node(triangle().with_state_set(StateSet::new().with_attribute(StateAttribute::LineWidth(2.0))));
        let masked = graph.add_node(triangle().with_node_mask(0b10));
        graph.add_child(root, plain).unwrap();
        graph.add_child(plain, leaf).unwrap();
        graph.add_child(root, masked).unwrap();

        let (view, projection) = camera();
        let mut cull = CullVisitor::new(0).with_traversal_mask(0b01);
        cull.reset(&view, &projection);
        cull.run(&mut graph, root);

        assert_eq!(cull.leaves().len(), 1);
        assert_eq!(cull.leaves()[0].state_sets, vec![root, leaf]);
    }

    #[test]
    fn test_arena_stops_growing_across_frames() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(Node::group());
        for i in 0..5 {
            let transform = graph.add_node(Node::matrix_transform(Mat4::translation(i as f32 * 0.1, 0.0, 0.0)));
            let leaf = graph.add_node(triangle());
            graph.add_child(root, transform).unwrap();
            graph.add_child(transform, leaf).unwrap();
        }

        let (view, projection) = camera();
        let mut cull = CullVisitor::new(2);
        cull.reset(&view, &projection);
        cull.run(&mut graph, root);
        let size = cull.pool().len();
        assert_eq!(size, 6);

        for _ in 0..3 {
            cull.reset(&view, &projection);
            cull.run(&mut graph, root);
        }
        assert_eq!(cull.pool().len(), size);
        assert_eq!(cull.leaves().len(), 5);
    }
}
