//! Uniform Buffers
//!
//! CPU staging array plus the GPU buffer it is uploaded to. Only generation 2
//! has uniform buffers; on generation 1 a [`UniformBuffer`] keeps its staging
//! data but owns no GPU object and every upload is skipped.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::renderer::backend::{BufferHandle, BufferTarget};
use crate::renderer::context::GpuContext;

/// Block binding of the global `ProjectionView` block.
pub const PROJECTION_VIEW_BINDING: u32 = 0;

/// Layout of the global `ProjectionView` block.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ProjectionViewUniforms {
    pub projection_matrix: Mat4,
}

impl Default for ProjectionViewUniforms {
    fn default() -> Self {
        Self {
            projection_matrix: Mat4::IDENTITY,
        }
    }
}

#[derive(Debug)]
pub struct UniformBuffer {
    data: Vec<f32>,
    buffer: Option<BufferHandle>,
}

impl UniformBuffer {
    pub fn new(ctx: &GpuContext, data: Vec<f32>) -> Self {
        let buffer = ctx.create_uniform_buffer(&data);
        Self { data, buffer }
    }

    #[inline]
    #[must_use]
    pub fn buffer(&self) -> Option<BufferHandle> {
        self.buffer
    }

    #[inline]
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Copies `values` into the staging array starting at float `offset`.
    ///
    /// Values past the end of the staging array are dropped.
    pub fn set_values(&mut self, values: &[f32], offset: usize) {
        let Some(dst) = self.data.get_mut(offset..) else {
            return;
        };
        let n = values.len().min(dst.len());
        dst[..n].copy_from_slice(&values[..n]);
    }

    /// Uploads the whole staging array.
    pub fn upload(&self, ctx: &GpuContext) {
        let Some(buffer) = self.buffer else {
            return;
        };
        let gl = ctx.gl();
        gl.bind_buffer(BufferTarget::Uniform, Some(buffer));
        gl.buffer_sub_data(BufferTarget::Uniform, 0, bytemuck::cast_slice(&self.data));
        gl.bind_buffer(BufferTarget::Uniform, None);
    }

    pub fn dispose(&mut self, ctx: &GpuContext) {
        if let Some(buffer) = self.buffer.take() {
            ctx.gl().delete_buffer(buffer);
        }
    }
}

/// Writes the camera projection into the global block and binds it to
/// [`PROJECTION_VIEW_BINDING`].
pub fn update_projection_view(ctx: &GpuContext, projection_matrix: Mat4) {
    let Some(buffer) = ctx.projection_view_buffer() else {
        return;
    };
    let block = ProjectionViewUniforms { projection_matrix };

    let gl = ctx.gl();
    gl.bind_buffer_base(BufferTarget::Uniform, PROJECTION_VIEW_BINDING, Some(buffer));
    gl.bind_buffer(BufferTarget::Uniform, Some(buffer));
    gl.buffer_sub_data(BufferTarget::Uniform, 0, bytemuck::bytes_of(&block));
    gl.bind_buffer(BufferTarget::Uniform, None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_view_block_is_one_matrix() {
        assert_eq!(size_of::<ProjectionViewUniforms>(), 64);
        assert_eq!(size_of::<ProjectionViewUniforms>() % 16, 0);
    }
}
