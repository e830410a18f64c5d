//! GL resource layer
//!
//! The graphics-context capability the engine drives, and the handles that
//! tie GPU resources to the context that created them.

mod context;
mod object;
mod buffer;
mod program;

pub use context::{
    BlendFactor, Capability, ContextId, CullFaceMode, DepthFunc, GlCommand, GraphicContext,
    PrimitiveMode, RecordingContext,
};
pub use object::{GlObject, GlObjectManager, GlResourceKind};
pub use buffer::BufferArray;
pub use program::Program;

use thiserror::Error;

/// Errors raised by context-bound resources
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GlError {
    /// Object used before `set_graphic_context`
    #[error("{0:?} used before a graphics context was set")]
    NoContext(GlResourceKind),

    /// Object used with a context other than its own
    #[error("resource belongs to context {expected}, used with context {found}")]
    ContextMismatch {
        /// Owning context
        expected: u32,
        /// Context it was used with
        found: u32,
    },

    /// The owning context was lost and restored since the object was bound
    #[error("{0:?} belongs to an invalidated context and must be rebound")]
    ContextInvalidated(GlResourceKind),

    /// The context is currently lost
    #[error("graphics context lost")]
    ContextLost,

    /// Resource creation failed
    #[error("failed to create {0:?}")]
    CreationFailed(GlResourceKind),

    /// Program link failed
    #[error("program link failed: {0}")]
    LinkFailed(String),
}
