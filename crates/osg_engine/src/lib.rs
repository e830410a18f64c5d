//! # OSG Engine
//!
//! A scene-graph engine for displaying point clouds and meshes through a
//! WebGL-style graphics context.
//!
//! ## Features
//!
//! - **Scene graph**: arena-stored DAG with visitor traversals
//! - **State stacking**: per-attribute stacks with redundant change elision
//! - **Shader generation**: node-graph shader permutations cached per state
//! - **Animation**: stacked transforms driven by keyframe channels
//! - **Background loading**: extension-keyed loaders run on a pager thread
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use osg_engine::prelude::*;
//!
//! fn main() -> Result<(), EngineError> {
//!     let mut viewer = Viewer::new(EngineSettings::default(), Registry::new())?;
//!     let root = viewer.graph_mut().add_node(Node::group());
//!     let points = viewer.graph_mut().add_node(Node::geometry(Geometry::points(vec![Vec3::zeros()])));
//!     viewer.graph_mut().add_child(root, points)?;
//!     viewer.set_scene_data(root)?;
//!
//!     let mut ctx = RecordingContext::new();
//!     let report = viewer.frame(&mut ctx)?;
//!     println!("drew {} leaves", report.draw.drawn);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod gl;
pub mod state;
pub mod scene;
pub mod spatial;
pub mod animation;
pub mod shader;
pub mod osg_db;
pub mod render;

mod error;
mod viewer;

pub use error::EngineError;
pub use viewer::{FrameReport, Viewer};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        EngineError, FrameReport, Viewer,
        animation::{
            Animation, AnimationManager, Channel, Keyframe, PlayMode, Sampler, StackedTransform,
            UpdateCallback, UpdateMatrixTransform,
        },
        config::{Config, EngineSettings, ShaderSettings},
        foundation::{
            math::{Mat4, Mat4Ext, Quat, Vec3, Vec4},
            time::{FrameStamp, Timer},
        },
        gl::{GlCommand, GraphicContext, RecordingContext},
        osg_db::{DatabasePager, LoadError, ReaderWriter, Registry},
        scene::{Geometry, Node, NodeFragment, NodeId, NodeVisitor, SceneGraph, UpdateVisitor},
        state::{StateAttribute, StateSet},
    };
}
