//! GPU Context
//!
//! The [`GpuContext`] bundles the backend with everything derived from it
//! at creation time: the API generation tag and the capability snapshots.
//!
//! There is no process-wide context. The [`Renderer`](crate::Renderer) owns
//! one and every GPU-issuing operation borrows it explicitly, so recreating
//! the renderer can never leave a component holding a stale handle.

use crate::errors::{MediumError, Result};
use crate::renderer::backend::{BufferHandle, BufferTarget, BufferUsage, GpuBackend};
use crate::renderer::capabilities::{Capabilities, Extensions, Precision};
use crate::renderer::uniform_buffer::ProjectionViewUniforms;

/// WebGL API generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generation {
    /// WebGL 1 / GLSL ES 1.00.
    Gen1,
    /// WebGL 2 / GLSL ES 3.00.
    Gen2,
}

impl Generation {
    #[inline]
    #[must_use]
    pub fn is_webgl2(self) -> bool {
        matches!(self, Self::Gen2)
    }

    /// Context id passed to `canvas.getContext`.
    #[must_use]
    pub fn context_name(self) -> &'static str {
        match self {
            Self::Gen1 => "webgl",
            Self::Gen2 => "webgl2",
        }
    }
}

/// Which side of a buffer binding a numeric buffer feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Float vertex data (`ARRAY_BUFFER`).
    Vertex,
    /// `u16` indices (`ELEMENT_ARRAY_BUFFER`).
    Index,
}

impl BufferKind {
    #[must_use]
    pub fn target(self) -> BufferTarget {
        match self {
            Self::Vertex => BufferTarget::Array,
            Self::Index => BufferTarget::ElementArray,
        }
    }
}

/// Numeric data handed to [`GpuContext::create_buffer`].
///
/// The element type is converted to the view type of the [`BufferKind`]
/// (floats for vertex buffers, `u16` for index buffers).
#[derive(Debug, Clone, Copy)]
pub enum BufferSource<'a> {
    F32(&'a [f32]),
    U16(&'a [u16]),
}

impl BufferSource<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::F32(data) => data.len(),
            Self::U16(data) => data.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn to_bytes(self, kind: BufferKind) -> Vec<u8> {
        match (kind, self) {
            (BufferKind::Vertex, Self::F32(data)) => bytemuck::cast_slice(data).to_vec(),
            (BufferKind::Vertex, Self::U16(data)) => {
                let floats: Vec<f32> = data.iter().map(|&v| f32::from(v)).collect();
                bytemuck::cast_slice(&floats).to_vec()
            }
            (BufferKind::Index, Self::U16(data)) => bytemuck::cast_slice(data).to_vec(),
            (BufferKind::Index, Self::F32(data)) => {
                let indices: Vec<u16> = data.iter().map(|&v| v as u16).collect();
                bytemuck::cast_slice(&indices).to_vec()
            }
        }
    }
}

/// The active GPU context of one renderer.
pub struct GpuContext {
    backend: Box<dyn GpuBackend>,
    generation: Generation,
    capabilities: Capabilities,
    extensions: Extensions,
    projection_view: Option<BufferHandle>,
}

impl GpuContext {
    /// Wraps `backend` and probes it.
    pub fn new(backend: Box<dyn GpuBackend>, precision: Precision) -> Self {
        let generation = backend.generation();
        let capabilities = Capabilities::probe(backend.as_ref(), precision);
        let extensions = Extensions::probe(backend.as_ref());

        log::debug!(
            "Created {} context: precision {}, {} texture units, vao {}, instancing {}",
            generation.context_name(),
            capabilities.precision,
            capabilities.max_textures,
            extensions.has_vertex_array_object(),
            extensions.has_instanced_arrays(),
        );

        let mut ctx = Self {
            backend,
            generation,
            capabilities,
            extensions,
            projection_view: None,
        };
        if generation.is_webgl2() {
            let block = ProjectionViewUniforms::default();
            ctx.projection_view =
                ctx.create_uniform_buffer(bytemuck::cast_slice(std::slice::from_ref(&block)));
        }
        ctx
    }

    /// The raw call surface.
    #[inline]
    #[must_use]
    pub fn gl(&self) -> &dyn GpuBackend {
        self.backend.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[inline]
    #[must_use]
    pub fn is_webgl2(&self) -> bool {
        self.generation.is_webgl2()
    }

    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    #[inline]
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// The global `ProjectionView` block, generation 2 only.
    #[inline]
    #[must_use]
    pub fn projection_view_buffer(&self) -> Option<BufferHandle> {
        self.projection_view
    }

    /// Allocates a vertex or index buffer and uploads `data`.
    ///
    /// The buffer is left unbound.
    pub fn create_buffer(
        &self,
        kind: BufferKind,
        data: BufferSource<'_>,
        dynamic: bool,
    ) -> Result<BufferHandle> {
        let gl = self.gl();
        let buffer = gl
            .create_buffer()
            .ok_or(MediumError::ResourceCreation("buffer"))?;
        let usage = if dynamic {
            BufferUsage::Dynamic
        } else {
            BufferUsage::Static
        };

        let target = kind.target();
        gl.bind_buffer(target, Some(buffer));
        gl.buffer_data(target, &data.to_bytes(kind), usage);
        gl.bind_buffer(target, None);
        Ok(buffer)
    }

    /// Re-uploads the whole content of an existing buffer.
    pub fn update_buffer(&self, buffer: BufferHandle, kind: BufferKind, data: BufferSource<'_>) {
        let gl = self.gl();
        let target = kind.target();
        gl.bind_buffer(target, Some(buffer));
        gl.buffer_sub_data(target, 0, &data.to_bytes(kind));
        gl.bind_buffer(target, None);
    }

    /// Allocates a dynamic uniform buffer holding `data`.
    ///
    /// Uniform buffers do not exist on generation 1: this logs a warning and
    /// returns `None` instead of failing.
    pub fn create_uniform_buffer(&self, data: &[f32]) -> Option<BufferHandle> {
        if !self.is_webgl2() {
            log::warn!("Uniform buffers are not supported on WebGL1");
            return None;
        }

        let gl = self.gl();
        let buffer = gl.create_buffer()?;
        gl.bind_buffer(BufferTarget::Uniform, Some(buffer));
        gl.buffer_data(BufferTarget::Uniform, bytemuck::cast_slice(data), BufferUsage::Dynamic);
        gl.bind_buffer(BufferTarget::Uniform, None);
        Some(buffer)
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("generation", &self.generation)
            .field("capabilities", &self.capabilities)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}
