//! Engine-level error type

use thiserror::Error;

use crate::config::ConfigError;
use crate::gl::GlError;
use crate::osg_db::LoadError;
use crate::scene::SceneError;
use crate::shader::ShaderError;

/// Errors surfaced by the [`Viewer`](crate::viewer::Viewer)
#[derive(Error, Debug)]
pub enum EngineError {
    /// Scene graph edit refused
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Graphics context or resource failure
    #[error("GL error: {0}")]
    Gl(#[from] GlError),

    /// Shader construction failure
    #[error("Shader error: {0}")]
    Shader(#[from] ShaderError),

    /// Loader failure
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Bad settings
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
