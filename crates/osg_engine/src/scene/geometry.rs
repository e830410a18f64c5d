//! Drawable geometry

use crate::foundation::math::Vec3;
use crate::gl::{BufferArray, GlError, GraphicContext, PrimitiveMode};
use crate::spatial::{BoundingBox, Triangle};

/// Vertex positions drawn with one primitive mode
///
/// Point clouds streamed by the loaders arrive as `Points` geometries; meshes
/// as `Triangles`.
#[derive(Debug, Clone)]
pub struct Geometry {
    positions: Vec<Vec3>,
    mode: PrimitiveMode,
    bounds: BoundingBox,
    vertex_buffer: BufferArray,
}

impl Geometry {
    /// Create a geometry from positions
    pub fn new(positions: Vec<Vec3>, mode: PrimitiveMode) -> Self {
        let bounds = BoundingBox::from_points(&positions);
        let vertex_buffer = BufferArray::from_vec3(&positions);
        Self {
            positions,
            mode,
            bounds,
            vertex_buffer,
        }
    }

    /// Point list
    pub fn points(positions: Vec<Vec3>) -> Self {
        Self::new(positions, PrimitiveMode::Points)
    }

    /// Triangle list; trailing vertices that do not form a triangle are ignored
    pub fn triangles(positions: Vec<Vec3>) -> Self {
        Self::new(positions, PrimitiveMode::Triangles)
    }

    /// Vertex positions
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Primitive mode
    pub fn mode(&self) -> PrimitiveMode {
        self.mode
    }

    /// Local bounds
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Triangles of a `Triangles` geometry, empty for other modes
    pub fn triangle_list(&self) -> Vec<Triangle> {
        if self.mode != PrimitiveMode::Triangles {
            return Vec::new();
        }
        self.positions
            .chunks_exact(3)
            .map(|c| Triangle::new(c[0], c[1], c[2]))
            .collect()
    }

    /// GPU copy of the positions
    pub fn vertex_buffer_mut(&mut self) -> &mut BufferArray {
        &mut self.vertex_buffer
    }

    /// Bind the vertex buffer and issue the draw call
    pub fn draw(&mut self, ctx: &mut dyn GraphicContext) -> Result<(), GlError> {
        if self.vertex_buffer.gl_object().graphic_context().is_err() {
            self.vertex_buffer.gl_object_mut().set_graphic_context(ctx.id());
        }
        let buffer = self.vertex_buffer.bind(ctx)?;
        ctx.bind_vertex_buffer("Vertex", buffer);
        ctx.draw_arrays(self.mode, self.positions.len());
        Ok(())
    }
}
