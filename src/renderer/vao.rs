//! Vertex array objects.
//!
//! Native on generation 2, through `OES_vertex_array_object` on generation 1.
//! Without support every method is a no-op and meshes rebind their
//! attributes on each draw instead.

use crate::renderer::backend::VertexArrayHandle;
use crate::renderer::context::GpuContext;

#[derive(Debug, Default)]
pub struct Vao {
    vao: Option<VertexArrayHandle>,
}

impl Vao {
    pub fn new(ctx: &GpuContext) -> Self {
        if !ctx.extensions().has_vertex_array_object() {
            return Self::default();
        }
        let vao = ctx.gl().create_vertex_array();
        if vao.is_none() {
            log::warn!("Failed to create vertex array object");
        }
        Self { vao }
    }

    /// `false` when attributes must be rebound every draw.
    #[inline]
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.vao.is_some()
    }

    pub fn bind(&self, ctx: &GpuContext) {
        if let Some(vao) = self.vao {
            ctx.gl().bind_vertex_array(Some(vao));
        }
    }

    pub fn unbind(&self, ctx: &GpuContext) {
        if self.vao.is_some() {
            ctx.gl().bind_vertex_array(None);
        }
    }

    pub fn dispose(&mut self, ctx: &GpuContext) {
        if let Some(vao) = self.vao.take() {
            ctx.gl().delete_vertex_array(vao);
        }
    }
}
