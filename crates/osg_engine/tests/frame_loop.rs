//! End-to-end frames against a recording context

use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;
use osg_engine::gl::{GlError, GlResourceKind};
use osg_engine::prelude::*;

fn viewer_with(registry: Registry) -> Viewer {
    let mut viewer = Viewer::new(EngineSettings::default(), registry)
        .unwrap()
        .with_timer(Timer::manual());
    viewer.set_camera(
        Mat4::look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::zeros(), Vec3::y()),
        Mat4::perspective(1.0, 1.0, 0.1, 100.0),
    );
    viewer
}

fn cloud(offset: f32) -> Geometry {
    Geometry::points((0..16).map(|i| Vec3::new(offset + i as f32 * 0.05, 0.0, 0.0)).collect())
}

fn count(commands: &[GlCommand], pred: impl Fn(&GlCommand) -> bool) -> usize {
    commands.iter().filter(|c| pred(c)).count()
}

#[test]
fn test_second_frame_only_draws() {
    let mut viewer = viewer_with(Registry::new());
    let graph = viewer.graph_mut();
    let root = graph.add_node(Node::group().with_state_set(
        StateSet::new()
            .with_attribute(StateAttribute::LineWidth(3.0))
            .with_attribute(StateAttribute::PointSize(2.0)),
    ));
    let a = graph.add_node(Node::geometry(cloud(-1.0)));
    let b = graph.add_node(Node::geometry(cloud(1.0)));
    graph.add_child(root, a).unwrap();
    graph.add_child(root, b).unwrap();
    viewer.set_scene_data(root).unwrap();

    let mut ctx = RecordingContext::new();
    let first = viewer.frame(&mut ctx).unwrap();
    assert_eq!(first.draw.drawn, 2);
    let commands = ctx.take_commands();
    assert_eq!(count(&commands, |c| matches!(c, GlCommand::LineWidth(_))), 1);
    assert_eq!(count(&commands, |c| matches!(c, GlCommand::LinkProgram(_))), 1);

    let second = viewer.frame(&mut ctx).unwrap();
    assert_eq!(second.draw.drawn, 2);
    assert_eq!(second.draw.state_changes, 0);
    let commands = ctx.take_commands();
    assert_eq!(count(&commands, |c| matches!(c, GlCommand::LineWidth(_))), 0);
    assert_eq!(count(&commands, |c| matches!(c, GlCommand::LinkProgram(_))), 0);
    assert_eq!(count(&commands, |c| matches!(c, GlCommand::BufferData(..))), 0);
    assert_eq!(count(&commands, |c| matches!(c, GlCommand::DrawArrays(..))), 2);
    assert_eq!(viewer.shader_generators().compile_count(), 1);
}

#[test]
fn test_context_restore_rebuilds_resources() {
    let mut viewer = viewer_with(Registry::new());
    let graph = viewer.graph_mut();
    let root = graph.add_node(
        Node::group().with_state_set(StateSet::new().with_attribute(StateAttribute::LineWidth(3.0))),
    );
    let leaf = graph.add_node(Node::geometry(cloud(0.0)));
    graph.add_child(root, leaf).unwrap();
    viewer.set_scene_data(root).unwrap();

    let mut ctx = RecordingContext::new();
    viewer.frame(&mut ctx).unwrap();
    assert_eq!(ctx.live_resources(), 2);

    ctx.lose_context();
    let lost = viewer.frame(&mut ctx);
    assert!(matches!(lost, Err(EngineError::Gl(GlError::ContextLost))));

    ctx.restore_context();
    ctx.take_commands();
    let report = viewer.frame(&mut ctx).unwrap();
    assert_eq!(report.draw.drawn, 1);
    let commands = ctx.commands();
    assert_eq!(count(commands, |c| matches!(c, GlCommand::Create(GlResourceKind::Program, _))), 1);
    assert_eq!(count(commands, |c| matches!(c, GlCommand::Create(GlResourceKind::Buffer, _))), 1);
    assert_eq!(count(commands, |c| matches!(c, GlCommand::LinkProgram(_))), 1);
    // Everything the new context holds was sent again
    assert_eq!(count(commands, |c| matches!(c, GlCommand::LineWidth(_))), 1);
    assert_eq!(ctx.live_resources(), 2);
    // The shader itself was not regenerated
    assert_eq!(viewer.shader_generators().compile_count(), 1);
}

#[test]
fn test_animation_moves_transform() {
    let mut viewer = viewer_with(Registry::new());
    let slide = Animation::new(
        "slide",
        vec![Channel::new(
            "mover",
            "translate",
            Sampler::Vec3(vec![
                Keyframe::new(0.0, Vec3::zeros()),
                Keyframe::new(1.0, Vec3::new(2.0, 0.0, 0.0)),
            ]),
        )],
    );
    let mut manager = AnimationManager::new().with_animation(slide);
    assert!(manager.play("slide", PlayMode::Once));

    let graph = viewer.graph_mut();
    let root = graph.add_node(Node::group().with_update_callback(UpdateCallback::AnimationManager(manager)));
    let mover = graph.add_node(
        Node::matrix_transform(Mat4::identity())
            .with_name("mover")
            .with_update_callback(UpdateCallback::MatrixTransform(
                UpdateMatrixTransform::new().with(StackedTransform::translate("translate", Vec3::zeros())),
            )),
    );
    let leaf = graph.add_node(Node::geometry(cloud(0.0)));
    graph.add_child(root, mover).unwrap();
    graph.add_child(mover, leaf).unwrap();
    viewer.set_scene_data(root).unwrap();

    let mut ctx = RecordingContext::new();
    let report = viewer.frame(&mut ctx).unwrap();
    assert_eq!(report.callbacks_run, 2);

    viewer.timer_mut().advance(0.5);
    viewer.frame(&mut ctx).unwrap();
    let world = viewer.graph().local_to_world(&[root, mover, leaf]);
    assert_relative_eq!(world, Mat4::translation(1.0, 0.0, 0.0), epsilon = 1e-5);

    // Past the end of a once-only animation the last key holds
    viewer.timer_mut().advance(4.5);
    viewer.frame(&mut ctx).unwrap();
    let world = viewer.graph().local_to_world(&[root, mover, leaf]);
    assert_relative_eq!(world, Mat4::translation(2.0, 0.0, 0.0), epsilon = 1e-5);
}

struct PointsReader;

impl ReaderWriter for PointsReader {
    fn name(&self) -> &str {
        "points"
    }

    fn read_node(&self, source: &str) -> Result<NodeFragment, LoadError> {
        Ok(NodeFragment::leaf(Node::group().with_name(source))
            .with_child(NodeFragment::leaf(Node::geometry(cloud(0.0)))))
    }
}

#[test]
fn test_paged_fragment_is_drawn_next_frame() {
    let mut registry = Registry::new();
    registry.add_reader_writer("pts", Arc::new(PointsReader));
    let mut viewer = viewer_with(registry);
    let root = viewer.graph_mut().add_node(Node::group());
    viewer.set_scene_data(root).unwrap();

    let mut ctx = RecordingContext::new();
    let id = viewer.pager_mut().request(root, "tile_0.pts").unwrap();
    let missing = viewer.pager_mut().request(root, "tile_1.las").unwrap();
    assert_ne!(id, missing);
    assert!(viewer.pager_mut().wait_for_pending(Duration::from_secs(5)));

    let report = viewer.frame(&mut ctx).unwrap();
    assert_eq!(report.attached.len(), 1);
    assert_eq!(report.load_failures.len(), 1);
    assert_eq!(report.load_failures[0].id, missing);
    assert_eq!(report.draw.drawn, 1);
    assert_eq!(viewer.graph().find_by_name("tile_0.pts"), report.attached);
}
