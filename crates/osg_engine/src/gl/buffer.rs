//! Vertex buffer arrays

use super::{GlError, GlObject, GlResourceKind, GraphicContext};
use crate::foundation::math::Vec3;

/// Float vertex data mirrored into a GPU buffer
///
/// The CPU copy is authoritative; it is re-uploaded on the next draw after
/// any change.
#[derive(Debug, Clone)]
pub struct BufferArray {
    object: GlObject,
    data: Vec<f32>,
    item_size: usize,
    dirty: bool,
}

impl BufferArray {
    /// Create a buffer of `item_size` floats per element
    pub fn new(data: Vec<f32>, item_size: usize) -> Self {
        Self {
            object: GlObject::new(GlResourceKind::Buffer),
            data,
            item_size,
            dirty: true,
        }
    }

    /// Pack positions into a 3-component buffer
    pub fn from_vec3(points: &[Vec3]) -> Self {
        let data = points.iter().flat_map(|p| [p.x, p.y, p.z]).collect();
        Self::new(data, 3)
    }

    /// Number of elements
    pub fn element_count(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.data.len() / self.item_size
        }
    }

    /// Raw float data
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Replace the data and mark it for upload
    pub fn set_data(&mut self, data: Vec<f32>) {
        self.data = data;
        self.dirty = true;
    }

    /// The underlying GL object
    pub fn gl_object(&self) -> &GlObject {
        &self.object
    }

    /// Mutable access to the underlying GL object
    pub fn gl_object_mut(&mut self) -> &mut GlObject {
        &mut self.object
    }

    /// Create the buffer if needed and upload pending data
    pub fn bind(&mut self, ctx: &mut dyn GraphicContext) -> Result<u32, GlError> {
        let created = self.object.is_created();
        let handle = self.object.ensure(ctx)?;
        if self.dirty || !created {
            ctx.buffer_data(handle, bytemuck::cast_slice(&self.data));
            self.dirty = false;
        }
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{GlCommand, RecordingContext};

    #[test]
    fn test_upload_happens_once_until_data_changes() {
        let mut ctx = RecordingContext::new();
        let mut buffer = BufferArray::from_vec3(&[Vec3::zeros(), Vec3::x()]);
        buffer.gl_object_mut().set_graphic_context(ctx.id());

        buffer.bind(&mut ctx).unwrap();
        buffer.bind(&mut ctx).unwrap();
        buffer.set_data(vec![1.0; 9]);
        buffer.bind(&mut ctx).unwrap();

        let uploads: Vec<_> = ctx
            .commands()
            .iter()
            .filter_map(|c| match c {
                GlCommand::BufferData(_, bytes) => Some(*bytes),
                _ => None,
            })
            .collect();
        assert_eq!(uploads, vec![24, 36]);
        assert_eq!(buffer.element_count(), 3);
    }
}
