//! Frame loop
//!
//! The [`Viewer`] owns the scene graph and every per-frame subsystem. One
//! call to [`Viewer::frame`] merges background loads, runs the update
//! traversal, culls against the camera, draws through the given graphics
//! context and finally flushes deferred GPU deletions.

use std::sync::Arc;

use crate::config::EngineSettings;
use crate::error::EngineError;
use crate::foundation::math::{Mat4, Mat4Ext};
use crate::foundation::time::{FrameStamp, Timer};
use crate::gl::{ContextId, GlObjectManager, GraphicContext};
use crate::osg_db::{DatabasePager, LoadFailure, PagerUpdate, Registry};
use crate::render::{CullVisitor, DrawStats, RenderStage};
use crate::scene::{Node, NodeId, NodeVisitor, SceneError, SceneGraph, UpdateVisitor};
use crate::shader::ShaderGeneratorProxy;
use crate::spatial::KdTreeBuilder;
use crate::state::State;

/// What one frame did
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Frame stamp the traversals ran with
    pub stamp: FrameStamp,
    /// Roots of fragments merged from the pager
    pub attached: Vec<NodeId>,
    /// Loads that failed since the previous frame
    pub load_failures: Vec<LoadFailure>,
    /// Update callbacks run
    pub callbacks_run: usize,
    /// Geometries rejected by the frustum
    pub culled: usize,
    /// Draw counters
    pub draw: DrawStats,
    /// GPU resources deleted at the end of the frame
    pub deleted: usize,
}

/// Scene graph, camera and per-frame traversals
pub struct Viewer {
    settings: EngineSettings,
    graph: SceneGraph,
    scene_data: Option<NodeId>,
    registry: Arc<Registry>,
    pager: DatabasePager,
    proxy: ShaderGeneratorProxy,
    state: State,
    gl_objects: GlObjectManager,
    update_visitor: UpdateVisitor,
    cull_visitor: CullVisitor,
    render_stage: RenderStage,
    kdtree_builder: KdTreeBuilder,
    timer: Timer,
    view: Mat4,
    projection: Mat4,
    context: Option<ContextId>,
}

impl std::fmt::Debug for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("nodes", &self.graph.len())
            .field("scene_data", &self.scene_data)
            .field("pager", &self.pager)
            .field("context", &self.context)
            .finish()
    }
}

impl Viewer {
    /// Create a viewer loading through `registry`
    pub fn new(settings: EngineSettings, registry: Registry) -> Result<Self, EngineError> {
        settings.validate()?;
        let registry = Arc::new(registry);
        let pager = DatabasePager::new(registry.clone())?;

        let mut update_visitor = UpdateVisitor::new();
        update_visitor.state_mut().traversal_mask = settings.traversal_mask;
        let cull_visitor =
            CullVisitor::new(settings.matrix_pool_initial_size).with_traversal_mask(settings.traversal_mask);

        log::info!("Viewer created with {} reader/writers", registry.len());
        Ok(Self {
            proxy: ShaderGeneratorProxy::new(&settings.shader),
            kdtree_builder: KdTreeBuilder::with_options(settings.kdtree),
            settings,
            graph: SceneGraph::new(),
            scene_data: None,
            registry,
            pager,
            state: State::new(),
            gl_objects: GlObjectManager::new(),
            update_visitor,
            cull_visitor,
            render_stage: RenderStage::new(),
            timer: Timer::new(),
            view: Mat4::identity(),
            projection: Mat4::perspective(std::f32::consts::FRAC_PI_4, 1.0, 0.1, 1000.0),
            context: None,
        })
    }

    /// Builder: drive simulation time from `timer`
    pub fn with_timer(mut self, timer: Timer) -> Self {
        self.timer = timer;
        self
    }

    /// Simulation clock; manual timers are advanced through this
    pub fn timer_mut(&mut self) -> &mut Timer {
        &mut self.timer
    }

    /// Settings the viewer was created with
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The scene graph
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Mutable scene graph
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// Make `root` the node traversals start from
    ///
    /// Triangle geometries below it get their KdTree shapes built here.
    pub fn set_scene_data(&mut self, root: NodeId) -> Result<(), SceneError> {
        if !self.graph.contains(root) {
            return Err(SceneError::NodeNotFound(root));
        }
        self.scene_data = Some(root);
        self.build_kdtrees(root);
        Ok(())
    }

    /// Root of the displayed scene
    pub fn scene_data(&self) -> Option<NodeId> {
        self.scene_data
    }

    /// Set the camera
    pub fn set_camera(&mut self, view: Mat4, projection: Mat4) {
        self.view = view;
        self.projection = projection;
    }

    /// Camera view matrix
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    /// Camera projection matrix
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    /// Loader registry shared with the pager thread
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Background loader
    pub fn pager(&self) -> &DatabasePager {
        &self.pager
    }

    /// Mutable background loader, to queue or cancel requests
    pub fn pager_mut(&mut self) -> &mut DatabasePager {
        &mut self.pager
    }

    /// Shader generators
    pub fn shader_generators(&self) -> &ShaderGeneratorProxy {
        &self.proxy
    }

    /// Mutable shader generators, to register custom passes
    pub fn shader_generators_mut(&mut self) -> &mut ShaderGeneratorProxy {
        &mut self.proxy
    }

    /// Attribute state shared by every draw
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Deferred GPU deletions
    pub fn gl_objects(&self) -> &GlObjectManager {
        &self.gl_objects
    }

    /// Remove `id` from the graph and queue its GPU buffers for deletion
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let mut node = self.graph.remove_node(id)?;
        if let Some(geometry) = node.as_geometry_mut() {
            geometry.vertex_buffer_mut().gl_object_mut().release(&mut self.gl_objects);
        }
        if self.scene_data == Some(id) {
            self.scene_data = None;
        }
        Some(node)
    }

    fn build_kdtrees(&mut self, root: NodeId) {
        let (built, failed) = (self.kdtree_builder.built_count(), self.kdtree_builder.failed_count());
        self.kdtree_builder.run(&mut self.graph, root);
        log::debug!(
            "KdTrees under {:?}: {} built, {} without triangles",
            root,
            self.kdtree_builder.built_count() - built,
            self.kdtree_builder.failed_count() - failed
        );
    }

    /// Merge finished loads, then run `visitor` over the scene
    ///
    /// Fragments attached here get their KdTree shapes before the traversal
    /// sees them.
    pub fn update_scene_graph(&mut self, visitor: &mut UpdateVisitor) -> PagerUpdate {
        let update = self.pager.update_scene_graph(&mut self.graph);
        for &root in &update.attached {
            self.build_kdtrees(root);
        }
        if let Some(root) = self.scene_data {
            visitor.run(&mut self.graph, root);
        }
        update
    }

    /// Rebind context-owned objects when the context changed since the last
    /// frame (first frame, another context, or a restore after a loss)
    fn sync_context(&mut self, ctx: &dyn GraphicContext) {
        let current = ctx.id();
        if self.context == Some(current) {
            return;
        }
        if let Some(previous) = self.context {
            log::info!(
                "Graphics context changed from {}:{} to {}:{}, rebinding",
                previous.id,
                previous.generation,
                current.id,
                current.generation
            );
            if previous.id == current.id {
                self.gl_objects.invalidate_context(previous);
            } else {
                // Still alive: its objects are deleted the next time it is current
                self.proxy.release_handles(&mut self.gl_objects);
                for (_, node) in self.graph.iter_mut() {
                    if let Some(geometry) = node.as_geometry_mut() {
                        geometry.vertex_buffer_mut().gl_object_mut().release(&mut self.gl_objects);
                    }
                }
            }
        }
        self.proxy.rebind(ctx);
        for (_, node) in self.graph.iter_mut() {
            if let Some(geometry) = node.as_geometry_mut() {
                geometry.vertex_buffer_mut().gl_object_mut().set_graphic_context(current);
            }
        }
        self.state.dirty_all();
        self.context = Some(current);
    }

    /// Run one frame against `ctx`
    ///
    /// Update and cull always run. Drawing fails fast on a lost context; the
    /// frame after a restore rebinds every program and buffer.
    pub fn frame(&mut self, ctx: &mut dyn GraphicContext) -> Result<FrameReport, EngineError> {
        let stamp = self.timer.tick();
        let mut report = FrameReport {
            stamp,
            ..FrameReport::default()
        };

        let mut visitor = std::mem::take(&mut self.update_visitor);
        visitor.set_frame_stamp(stamp);
        visitor.reset_stats();
        let update = self.update_scene_graph(&mut visitor);
        report.callbacks_run = visitor.callbacks_run();
        self.update_visitor = visitor;
        report.attached = update.attached;
        report.load_failures = update.failures;

        let Some(root) = self.scene_data else {
            return Ok(report);
        };

        self.cull_visitor.reset(&self.view, &self.projection);
        self.cull_visitor.run(&mut self.graph, root);
        report.culled = self.cull_visitor.culled_count();

        self.sync_context(&*ctx);
        report.draw = self.render_stage.draw(
            &mut self.graph,
            &self.cull_visitor,
            &mut self.state,
            &mut self.proxy,
            ctx,
        )?;

        report.deleted = self
            .gl_objects
            .flush_deleted(ctx, self.settings.gl_deletions_per_frame);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::gl::{GlCommand, RecordingContext};
    use crate::scene::Geometry;

    fn viewer() -> Viewer {
        let mut viewer = Viewer::new(EngineSettings::default(), Registry::new())
            .unwrap()
            .with_timer(Timer::manual());
        viewer.set_camera(
            Mat4::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y()),
            Mat4::perspective(1.0, 1.0, 0.1, 100.0),
        );
        viewer
    }

    fn triangle() -> Node {
        Node::geometry(Geometry::triangles(vec![Vec3::zeros(), Vec3::x(), Vec3::y()]))
    }

    #[test]
    fn test_frame_without_scene_draws_nothing() {
        let mut viewer = viewer();
        let mut ctx = RecordingContext::new();
        let report = viewer.frame(&mut ctx).unwrap();
        assert_eq!(report.draw, DrawStats::default());
        assert!(ctx.commands().is_empty());
    }

    #[test]
    fn test_scene_data_must_exist() {
        let mut viewer = viewer();
        let id = viewer.graph_mut().add_node(Node::group());
        viewer.graph_mut().remove_node(id);
        assert_eq!(viewer.set_scene_data(id), Err(SceneError::NodeNotFound(id)));
    }

    #[test]
    fn test_set_scene_data_builds_shapes() {
        let mut viewer = viewer();
        let root = viewer.graph_mut().add_node(Node::group());
        let mesh = viewer.graph_mut().add_node(triangle());
        viewer.graph_mut().add_child(root, mesh).unwrap();
        viewer.set_scene_data(root).unwrap();
        assert!(viewer.graph().node(mesh).unwrap().shape().is_some());
    }

    #[test]
    fn test_switching_contexts_deletes_on_the_owner() {
        let mut viewer = viewer();
        let root = viewer.graph_mut().add_node(Node::group());
        let mesh = viewer.graph_mut().add_node(triangle());
        viewer.graph_mut().add_child(root, mesh).unwrap();
        viewer.set_scene_data(root).unwrap();

        let mut a = RecordingContext::new();
        let mut b = RecordingContext::new();
        viewer.frame(&mut a).unwrap();
        assert_eq!(a.live_resources(), 2);

        // Program and buffer of `a` wait for `a` to come back
        viewer.frame(&mut b).unwrap();
        assert_eq!(b.live_resources(), 2);
        assert_eq!(viewer.gl_objects().pending(a.id()), 2);
        assert_eq!(a.live_resources(), 2);

        a.take_commands();
        let report = viewer.frame(&mut a).unwrap();
        assert_eq!(report.draw.drawn, 1);
        assert_eq!(report.deleted, 2);
        assert_eq!(a.live_resources(), 2);
        assert_eq!(viewer.gl_objects().pending(a.id()), 0);
        assert_eq!(viewer.gl_objects().pending(b.id()), 2);
        assert_eq!(a.commands().iter().filter(|c| matches!(c, GlCommand::Delete(..))).count(), 2);

        viewer.frame(&mut a).unwrap();
        assert_eq!(a.live_resources(), 2);
        assert_eq!(viewer.shader_generators().compile_count(), 1);
    }

    #[test]
    fn test_removed_geometry_buffers_are_deleted_on_next_frame() {
        let mut viewer = viewer();
        let root = viewer.graph_mut().add_node(Node::group());
        let mesh = viewer.graph_mut().add_node(triangle());
        viewer.graph_mut().add_child(root, mesh).unwrap();
        viewer.set_scene_data(root).unwrap();

        let mut ctx = RecordingContext::new();
        viewer.frame(&mut ctx).unwrap();
        let buffers = ctx.live_resources();

        viewer.remove_node(mesh).unwrap();
        assert_eq!(viewer.gl_objects().pending(ctx.id()), 1);
        let report = viewer.frame(&mut ctx).unwrap();
        assert_eq!(report.deleted, 1);
        assert_eq!(report.draw.drawn, 0);
        assert_eq!(ctx.live_resources(), buffers - 1);
        assert!(ctx.commands().iter().any(|c| matches!(c, GlCommand::Delete(..))));
    }
}
