//! Update traversal

use super::{NodeId, NodeVisitor, SceneGraph, TraversalMode, VisitorState};
use crate::foundation::time::FrameStamp;

/// Runs node update callbacks once per frame, parents before children
#[derive(Debug)]
pub struct UpdateVisitor {
    state: VisitorState,
    frame_stamp: FrameStamp,
    callbacks_run: usize,
}

impl UpdateVisitor {
    /// Update visitor over active children
    pub fn new() -> Self {
        Self {
            state: VisitorState::new(TraversalMode::ActiveChildren),
            frame_stamp: FrameStamp::default(),
            callbacks_run: 0,
        }
    }

    /// Frame the next traversal runs for
    pub fn set_frame_stamp(&mut self, stamp: FrameStamp) {
        self.frame_stamp = stamp;
    }

    /// Current frame
    pub fn frame_stamp(&self) -> &FrameStamp {
        &self.frame_stamp
    }

    /// Callbacks run since the last [`UpdateVisitor::reset_stats`]
    pub fn callbacks_run(&self) -> usize {
        self.callbacks_run
    }

    /// Clear the per-frame statistics
    pub fn reset_stats(&mut self) {
        self.callbacks_run = 0;
    }
}

impl Default for UpdateVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeVisitor for UpdateVisitor {
    fn state(&self) -> &VisitorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut VisitorState {
        &mut self.state
    }

    fn apply(&mut self, graph: &mut SceneGraph, id: NodeId) {
        // The callback is detached while it runs so it can borrow the graph
        let callback = graph.node_mut(id).and_then(|n| n.take_update_callback());
        if let Some(mut callback) = callback {
            callback.update(graph, id, &self.frame_stamp);
            self.callbacks_run += 1;
            if let Some(node) = graph.node_mut(id) {
                node.set_update_callback(callback);
            }
        }
        self.traverse(graph, id);
    }
}
