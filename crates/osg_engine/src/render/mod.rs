//! Cull and draw
//!
//! The [`CullVisitor`] turns the scene graph into a flat list of
//! [`RenderLeaf`]s for the current camera; the [`RenderStage`] draws them.

mod cull_visitor;
mod render_stage;

pub use cull_visitor::{CullVisitor, RenderLeaf};
pub use render_stage::{DrawStats, RenderStage};
