//! Point cloud viewer demo
//!
//! Streams an `.xyz` point cloud through the database pager, spins it with a
//! transform animation and runs a fixed number of frames against a recording
//! graphics context, logging what each frame did.
//!
//! Usage: `pointcloud_viewer [cloud.xyz] [frames]`. Without a file a small
//! helix is generated into the temp directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use osg_engine::foundation::logging;
use osg_engine::prelude::*;
use osg_engine::state::Material;
use thiserror::Error;

#[derive(Error, Debug)]
enum ViewerError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("failed to write sample cloud: {0}")]
    Io(#[from] std::io::Error),

    #[error("pager did not finish loading {0} in time")]
    Timeout(String),
}

/// Reads whitespace separated `x y z` lines; `#` starts a comment
struct XyzReader;

impl ReaderWriter for XyzReader {
    fn name(&self) -> &str {
        "xyz"
    }

    fn read_node(&self, source: &str) -> Result<NodeFragment, LoadError> {
        let text = std::fs::read_to_string(source).map_err(|error| LoadError::Io {
            path: source.to_string(),
            error,
        })?;

        let mut points = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let coords: Result<Vec<f32>, _> = line.split_whitespace().take(3).map(str::parse).collect();
            match coords {
                Ok(c) if c.len() == 3 => points.push(Vec3::new(c[0], c[1], c[2])),
                _ => {
                    return Err(LoadError::Parse {
                        path: source.to_string(),
                        line: index + 1,
                        message: format!("expected three coordinates, got '{line}'"),
                    })
                }
            }
        }

        let name = Path::new(source)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(source)
            .to_string();
        log::info!("Read {} points from {}", points.len(), source);
        Ok(NodeFragment::leaf(Node::group().with_name(name))
            .with_child(NodeFragment::leaf(Node::geometry(Geometry::points(points)))))
    }
}

fn write_sample_cloud() -> Result<PathBuf, ViewerError> {
    let path = std::env::temp_dir().join("pointcloud_viewer_helix.xyz");
    let mut text = String::from("# generated helix\n");
    for i in 0..512 {
        let t = i as f32 * 0.05;
        text.push_str(&format!("{} {} {}\n", t.cos(), t.sin(), t * 0.1 - 1.25));
    }
    std::fs::write(&path, text)?;
    Ok(path)
}

fn spin_animation() -> Animation {
    let turns = (0..=4)
        .map(|i| {
            let angle = i as f32 * std::f32::consts::FRAC_PI_2;
            Keyframe::new(f64::from(i), angle)
        })
        .collect();
    Animation::new("spin", vec![Channel::new("cloud_transform", "rotateZ", Sampler::Float(turns))])
}

fn run(settings: EngineSettings) -> Result<(), ViewerError> {
    let mut args = std::env::args().skip(1);
    let source = match args.next() {
        Some(path) => PathBuf::from(path),
        None => write_sample_cloud()?,
    };
    let frames: u64 = args.next().and_then(|n| n.parse().ok()).unwrap_or(8);

    let mut registry = Registry::new();
    registry.add_reader_writer("xyz", Arc::new(XyzReader));

    let mut viewer = Viewer::new(settings, registry)?.with_timer(Timer::manual());
    viewer.set_camera(
        Mat4::look_at(Vec3::new(0.0, -4.0, 3.0), Vec3::zeros(), Vec3::z()),
        Mat4::perspective(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 0.1, 100.0),
    );

    let mut manager = AnimationManager::new().with_animation(spin_animation());
    manager.play("spin", PlayMode::Loop);

    let graph = viewer.graph_mut();
    let root = graph.add_node(
        Node::group()
            .with_name("root")
            .with_update_callback(UpdateCallback::AnimationManager(manager)),
    );
    let transform = graph.add_node(
        Node::matrix_transform(Mat4::identity())
            .with_name("cloud_transform")
            .with_state_set(
                StateSet::new()
                    .with_attribute(StateAttribute::PointSize(3.0))
                    .with_attribute(StateAttribute::Material(Material {
                        diffuse: Vec4::new(0.2, 0.8, 0.4, 1.0),
                        ..Material::default()
                    })),
            )
            .with_update_callback(UpdateCallback::MatrixTransform(
                UpdateMatrixTransform::new().with(StackedTransform::rotate("rotateZ", Vec3::z(), 0.0)),
            )),
    );
    graph.add_child(root, transform).map_err(EngineError::from)?;
    viewer.set_scene_data(root).map_err(EngineError::from)?;

    let source = source.to_string_lossy().into_owned();
    viewer.pager_mut().request(transform, &source)?;
    if !viewer.pager_mut().wait_for_pending(Duration::from_secs(10)) {
        return Err(ViewerError::Timeout(source));
    }

    let mut ctx = RecordingContext::new();
    for _ in 0..frames {
        let report = viewer.frame(&mut ctx)?;
        for failure in &report.load_failures {
            log::error!("Could not load {}: {}", failure.source, failure.error);
        }
        log::info!(
            "Frame {} t={:.2}s: {} attached, {} callbacks, {} drawn, {} culled, {} state changes, {} commands",
            report.stamp.frame_number,
            report.stamp.simulation_time,
            report.attached.len(),
            report.callbacks_run,
            report.draw.drawn,
            report.culled,
            report.draw.state_changes,
            ctx.take_commands().len()
        );
        viewer.timer_mut().advance(0.25);
    }

    log::info!(
        "Done: {} shader programs compiled for {} nodes",
        viewer.shader_generators().compile_count(),
        viewer.graph().len()
    );
    Ok(())
}

fn main() {
    let settings = EngineSettings::load_from_file("pointcloud_viewer.toml");
    let level = settings.as_ref().map_or("info", |s| s.log_level.as_str()).to_string();
    logging::init_with_level(&level);

    let settings = settings.unwrap_or_else(|e| {
        log::debug!("Using default settings: {}", e);
        EngineSettings::default()
    });
    if let Err(e) = run(settings) {
        log::error!("pointcloud_viewer failed: {}", e);
        std::process::exit(1);
    }
}
