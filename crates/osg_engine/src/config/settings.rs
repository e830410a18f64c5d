//! # Engine Settings
//!
//! Tunables for the traversal, resource and shader subsystems. Loadable from
//! TOML or RON through [`Config`]; every field has a default so partial files
//! are fine.

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::spatial::KdTreeBuildOptions;

/// Shader generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderSettings {
    /// Float precision declared at the top of fragment shaders
    pub precision: String,
    /// Annotate generated sources with their fingerprint and node types
    pub emit_comments: bool,
}

impl Default for ShaderSettings {
    fn default() -> Self {
        Self {
            precision: "highp".to_string(),
            emit_comments: cfg!(debug_assertions),
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Traversal mask given to the update and cull visitors
    pub traversal_mask: u32,
    /// Matrices pre-allocated by the cull pass arena
    pub matrix_pool_initial_size: usize,
    /// Options for lazily built KdTrees
    pub kdtree: KdTreeBuildOptions,
    /// Deferred GL deletions flushed per frame; 0 flushes everything
    pub gl_deletions_per_frame: usize,
    /// Shader generation settings
    pub shader: ShaderSettings,
}

impl EngineSettings {
    /// Create settings with defaults
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            traversal_mask: u32::MAX,
            matrix_pool_initial_size: 64,
            kdtree: KdTreeBuildOptions::default(),
            gl_deletions_per_frame: 32,
            shader: ShaderSettings::default(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the traversal mask
    pub fn with_traversal_mask(mut self, mask: u32) -> Self {
        self.traversal_mask = mask;
        self
    }

    /// Set KdTree build options
    pub fn with_kdtree(mut self, options: KdTreeBuildOptions) -> Self {
        self.kdtree = options;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.traversal_mask == 0 {
            return Err(ConfigError::Invalid(
                "traversal mask of 0 would skip every node".to_string(),
            ));
        }
        if self.kdtree.target_num_triangles_per_leaf == 0 {
            return Err(ConfigError::Invalid(
                "kdtree.target_num_triangles_per_leaf must be at least 1".to_string(),
            ));
        }
        if self.kdtree.max_num_levels == 0 {
            return Err(ConfigError::Invalid(
                "kdtree.max_num_levels must be at least 1".to_string(),
            ));
        }
        if !matches!(self.shader.precision.as_str(), "lowp" | "mediump" | "highp") {
            return Err(ConfigError::Invalid(format!(
                "unknown shader precision '{}'",
                self.shader.precision
            )));
        }
        Ok(())
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineSettings {}
