//! Scene graph
//!
//! Nodes are stored in a [`SceneGraph`] arena and addressed by [`NodeId`].
//! Traversals implement [`NodeVisitor`].

mod geometry;
mod graph;
mod node;
mod visitor;
mod update_visitor;

pub use geometry::Geometry;
pub use graph::{NodeId, SceneGraph};
pub use node::{Node, NodeFragment, NodeKind, NODE_MASK_ALL};
pub use visitor::{NodeVisitor, TraversalMode, VisitorState};
pub use update_visitor::UpdateVisitor;

use thiserror::Error;

/// Scene graph construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Handle does not refer to a live node
    #[error("node {0:?} not found")]
    NodeNotFound(NodeId),

    /// Edge would make a node its own ancestor
    #[error("adding {child:?} under {parent:?} would create a cycle")]
    WouldCreateCycle {
        /// Prospective parent
        parent: NodeId,
        /// Prospective child
        child: NodeId,
    },
}
