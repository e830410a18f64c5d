//! Animation
//!
//! Transform nodes carry an [`UpdateMatrixTransform`] whose ordered
//! [`StackedTransform`] entries compose the local matrix. An
//! [`AnimationManager`] samples [`Channel`]s and writes the entries' targets
//! before the update traversal reaches them.

mod target;
mod channel;
mod stacked_transform;
mod update_matrix_transform;
mod manager;

pub use target::AnimationTarget;
pub use channel::{Channel, ChannelValue, Keyframe, Sampler};
pub use stacked_transform::{StackedElement, StackedTransform};
pub use update_matrix_transform::UpdateMatrixTransform;
pub use manager::{Animation, AnimationManager, PlayMode};

use crate::foundation::time::FrameStamp;
use crate::scene::{NodeId, SceneGraph};

/// Per-frame behaviour attached to a node and run by the update traversal
#[derive(Debug, Clone)]
pub enum UpdateCallback {
    /// Recompose the node's matrix from its transform stack
    MatrixTransform(UpdateMatrixTransform),
    /// Advance animations of the subtree
    AnimationManager(AnimationManager),
}

impl UpdateCallback {
    /// Run for node `id`. The callback has been detached from the node.
    pub(crate) fn update(&mut self, graph: &mut SceneGraph, id: NodeId, stamp: &FrameStamp) {
        match self {
            UpdateCallback::MatrixTransform(update) => {
                let matrix = update.compute_matrix();
                let applied = graph.node_mut(id).is_some_and(|n| n.set_matrix(matrix));
                if !applied {
                    log::warn!("Transform stack attached to a node without a matrix");
                }
            }
            UpdateCallback::AnimationManager(manager) => manager.update(graph, id, stamp),
        }
    }

    /// The animation manager, if this is one
    pub fn as_animation_manager_mut(&mut self) -> Option<&mut AnimationManager> {
        match self {
            UpdateCallback::AnimationManager(manager) => Some(manager),
            _ => None,
        }
    }

    /// The transform stack, if this is one
    pub fn as_matrix_transform_mut(&mut self) -> Option<&mut UpdateMatrixTransform> {
        match self {
            UpdateCallback::MatrixTransform(update) => Some(update),
            _ => None,
        }
    }
}
