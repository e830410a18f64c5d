//! Context-scoped GPU resource handles
//!
//! A [`GlObject`] is bound to exactly one graphics context. It refuses to be
//! used before a context is set, with another context, or with a newer
//! incarnation of its context after a loss. Deletion is deferred through the
//! [`GlObjectManager`] so it always happens on the owning context.

use std::collections::HashMap;

use super::{ContextId, GlError, GraphicContext};

/// Kind of GPU resource behind a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlResourceKind {
    /// Vertex or index buffer
    Buffer,
    /// Texture object
    Texture,
    /// Single shader stage
    Shader,
    /// Linked program
    Program,
    /// Framebuffer object
    FrameBuffer,
    /// Renderbuffer object
    RenderBuffer,
}

/// Handle to one GPU resource owned by one context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlObject {
    kind: GlResourceKind,
    context: Option<ContextId>,
    handle: Option<u32>,
}

impl GlObject {
    /// Create an unbound object; a context must be set before use
    pub fn new(kind: GlResourceKind) -> Self {
        Self {
            kind,
            context: None,
            handle: None,
        }
    }

    /// Kind of the underlying resource
    pub fn kind(&self) -> GlResourceKind {
        self.kind
    }

    /// Bind this object to a context
    ///
    /// Rebinding forgets the current handle: after a context loss the handle
    /// died with the context, otherwise it must be released first.
    pub fn set_graphic_context(&mut self, context: ContextId) {
        if self.context != Some(context) && self.handle.is_some() {
            log::debug!(
                "{:?} rebound from {:?} to {:?}, dropping handle {:?}",
                self.kind, self.context, context, self.handle
            );
            self.handle = None;
        }
        self.context = Some(context);
    }

    /// The bound context
    pub fn graphic_context(&self) -> Result<ContextId, GlError> {
        self.context.ok_or(GlError::NoContext(self.kind))
    }

    /// Raw handle if the resource exists
    pub fn handle(&self) -> Option<u32> {
        self.handle
    }

    /// True once the resource has been created on its context
    pub fn is_created(&self) -> bool {
        self.handle.is_some()
    }

    /// Check that `ctx` is the live context this object belongs to
    pub fn validate(&self, ctx: &dyn GraphicContext) -> Result<(), GlError> {
        let own = self.graphic_context()?;
        let current = ctx.id();
        if own.id != current.id {
            return Err(GlError::ContextMismatch {
                expected: own.id,
                found: current.id,
            });
        }
        if own.generation != current.generation {
            return Err(GlError::ContextInvalidated(self.kind));
        }
        if ctx.is_context_lost() {
            return Err(GlError::ContextLost);
        }
        Ok(())
    }

    /// Create the resource on first use and return its handle
    pub fn ensure(&mut self, ctx: &mut dyn GraphicContext) -> Result<u32, GlError> {
        self.validate(&*ctx)?;
        if let Some(handle) = self.handle {
            return Ok(handle);
        }
        let handle = ctx.create_resource(self.kind)?;
        self.handle = Some(handle);
        Ok(handle)
    }

    /// Schedule deletion on the owning context; the object can be recreated
    /// afterwards with [`GlObject::ensure`]
    pub fn release(&mut self, manager: &mut GlObjectManager) {
        if let (Some(context), Some(handle)) = (self.context, self.handle.take()) {
            manager.schedule_deletion(context, self.kind, handle);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingDeletion {
    generation: u32,
    kind: GlResourceKind,
    handle: u32,
}

/// Per-context queues of resources waiting to be deleted
#[derive(Debug, Default)]
pub struct GlObjectManager {
    pending: HashMap<u32, Vec<PendingDeletion>>,
}

impl GlObjectManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a handle for deletion on `context`
    pub fn schedule_deletion(&mut self, context: ContextId, kind: GlResourceKind, handle: u32) {
        self.pending.entry(context.id).or_default().push(PendingDeletion {
            generation: context.generation,
            kind,
            handle,
        });
    }

    /// Number of deletions waiting for `context`
    pub fn pending(&self, context: ContextId) -> usize {
        self.pending.get(&context.id).map_or(0, Vec::len)
    }

    /// Delete up to `budget` queued resources through `ctx` (0 = all).
    ///
    /// Entries from an older incarnation of the context are discarded: their
    /// handles no longer exist.
    pub fn flush_deleted(&mut self, ctx: &mut dyn GraphicContext, budget: usize) -> usize {
        if ctx.is_context_lost() {
            return 0;
        }
        let current = ctx.id();
        let Some(queue) = self.pending.get_mut(&current.id) else {
            return 0;
        };
        queue.retain(|entry| entry.generation == current.generation);

        let count = if budget == 0 { queue.len() } else { budget.min(queue.len()) };
        for entry in queue.drain(..count) {
            ctx.delete_resource(entry.kind, entry.handle);
        }
        if queue.is_empty() {
            self.pending.remove(&current.id);
        }
        count
    }

    /// Forget everything queued for a context that was lost
    pub fn invalidate_context(&mut self, context: ContextId) {
        if let Some(queue) = self.pending.remove(&context.id) {
            log::debug!("dropping {} pending deletions of lost context {}", queue.len(), context.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{GlCommand, RecordingContext};

    #[test]
    fn test_use_before_context_fails_fast() {
        let mut ctx = RecordingContext::new();
        let mut object = GlObject::new(GlResourceKind::Buffer);
        assert!(matches!(object.ensure(&mut ctx), Err(GlError::NoContext(GlResourceKind::Buffer))));
        assert_eq!(ctx.live_resources(), 0);
    }

    #[test]
    fn test_other_context_is_rejected() {
        let mut owner = RecordingContext::new();
        let mut other = RecordingContext::new();
        let mut object = GlObject::new(GlResourceKind::Texture);
        object.set_graphic_context(owner.id());
        object.ensure(&mut owner).unwrap();
        assert!(matches!(object.ensure(&mut other), Err(GlError::ContextMismatch { .. })));
    }

    #[test]
    fn test_restored_context_requires_rebinding() {
        let mut ctx = RecordingContext::new();
        let mut object = GlObject::new(GlResourceKind::Program);
        object.set_graphic_context(ctx.id());
        object.ensure(&mut ctx).unwrap();

        ctx.lose_context();
        assert!(matches!(object.ensure(&mut ctx), Err(GlError::ContextLost)));
        ctx.restore_context();
        assert!(matches!(object.ensure(&mut ctx), Err(GlError::ContextInvalidated(_))));

        object.set_graphic_context(ctx.id());
        assert!(object.ensure(&mut ctx).is_ok());
    }

    #[test]
    fn test_deletion_goes_through_owning_context() {
        let mut ctx = RecordingContext::new();
        let mut manager = GlObjectManager::new();
        let mut objects: Vec<_> = (0..3).map(|_| GlObject::new(GlResourceKind::Buffer)).collect();
        for object in &mut objects {
            object.set_graphic_context(ctx.id());
            object.ensure(&mut ctx).unwrap();
            object.release(&mut manager);
        }
        assert_eq!(manager.pending(ctx.id()), 3);

        assert_eq!(manager.flush_deleted(&mut ctx, 2), 2);
        assert_eq!(manager.flush_deleted(&mut ctx, 0), 1);
        assert_eq!(ctx.live_resources(), 0);
        let deletes = ctx.commands().iter().filter(|c| matches!(c, GlCommand::Delete(..))).count();
        assert_eq!(deletes, 3);
    }

    #[test]
    fn test_deletions_from_lost_generation_are_dropped() {
        let mut ctx = RecordingContext::new();
        let mut manager = GlObjectManager::new();
        let mut object = GlObject::new(GlResourceKind::Buffer);
        object.set_graphic_context(ctx.id());
        object.ensure(&mut ctx).unwrap();
        object.release(&mut manager);

        ctx.lose_context();
        ctx.restore_context();
        assert_eq!(manager.flush_deleted(&mut ctx, 0), 0);
        assert_eq!(manager.pending(ctx.id()), 0);
    }
}
