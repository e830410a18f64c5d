//! Linked shader programs

use super::{GlError, GlObject, GlObjectManager, GlResourceKind, GraphicContext};

/// A vertex/fragment source pair and the GL program built from it
#[derive(Debug, Clone)]
pub struct Program {
    object: GlObject,
    vertex_source: String,
    fragment_source: String,
    linked: bool,
}

impl Program {
    /// Create an unlinked program
    pub fn new(vertex_source: String, fragment_source: String) -> Self {
        Self {
            object: GlObject::new(GlResourceKind::Program),
            vertex_source,
            fragment_source,
            linked: false,
        }
    }

    /// Vertex stage source
    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    /// Fragment stage source
    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    /// The underlying GL object
    pub fn gl_object(&self) -> &GlObject {
        &self.object
    }

    /// Mutable access to the underlying GL object
    pub fn gl_object_mut(&mut self) -> &mut GlObject {
        &mut self.object
    }

    /// Bind to a context, forcing a relink on next use
    pub fn set_graphic_context(&mut self, ctx: &dyn GraphicContext) {
        if self.object.graphic_context().ok() != Some(ctx.id()) {
            self.linked = false;
        }
        self.object.set_graphic_context(ctx.id());
    }

    /// Queue the GL program for deletion on its context; the sources stay
    /// and the program relinks on next use
    pub fn release(&mut self, manager: &mut GlObjectManager) {
        self.object.release(manager);
        self.linked = false;
    }

    /// Link on first use and make the program current
    pub fn apply(&mut self, ctx: &mut dyn GraphicContext) -> Result<u32, GlError> {
        let handle = self.object.ensure(ctx)?;
        if !self.linked {
            ctx.link_program(handle, &self.vertex_source, &self.fragment_source)?;
            self.linked = true;
        }
        ctx.use_program(handle);
        Ok(handle)
    }
}
