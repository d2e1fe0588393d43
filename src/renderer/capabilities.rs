//! Capability Prober
//!
//! Queries the active context once, right after creation, and freezes the
//! answers into [`Capabilities`] and [`Extensions`] snapshots.

use std::fmt;

use crate::renderer::backend::{Extension, GpuBackend, Limit, ShaderStage};
use crate::renderer::context::Generation;

/// Float precision qualifier for fragment shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    #[default]
    Highp,
    Mediump,
    Lowp,
}

impl Precision {
    /// GLSL keyword.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Highp => "highp",
            Self::Mediump => "mediump",
            Self::Lowp => "lowp",
        }
    }

    /// `*_FLOAT` enum used by `getShaderPrecisionFormat`.
    #[must_use]
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Highp => 0x8DF2,
            Self::Mediump => 0x8DF1,
            Self::Lowp => 0x8DF0,
        }
    }

    /// The next lower precision, if any.
    #[must_use]
    pub fn lower(self) -> Option<Self> {
        match self {
            Self::Highp => Some(Self::Mediump),
            Self::Mediump => Some(Self::Lowp),
            Self::Lowp => None,
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// How an optional feature is provided by the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionSupport {
    /// Part of the core API (generation 2).
    Core,
    /// Enabled through the named WebGL1 extension.
    Extension(&'static str),
}

/// Optional features; `None` means unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extensions {
    pub vertex_array_object: Option<ExtensionSupport>,
    pub instanced_arrays: Option<ExtensionSupport>,
    pub float_textures: Option<ExtensionSupport>,
}

impl Extensions {
    #[inline]
    #[must_use]
    pub fn has_vertex_array_object(&self) -> bool {
        self.vertex_array_object.is_some()
    }

    #[inline]
    #[must_use]
    pub fn has_instanced_arrays(&self) -> bool {
        self.instanced_arrays.is_some()
    }

    #[inline]
    #[must_use]
    pub fn has_float_textures(&self) -> bool {
        self.float_textures.is_some()
    }
}

/// Read-only limits snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Highest float precision supported by both shader stages, at most the
    /// requested one.
    pub precision: Precision,
    pub max_textures: usize,
    pub max_vertex_textures: usize,
    pub max_texture_size: usize,
    pub max_cubemap_size: usize,
    pub max_attributes: usize,
    pub max_vertex_uniforms: usize,
    pub max_varyings: usize,
    pub max_fragment_uniforms: usize,
}

impl Capabilities {
    /// Probes limits and resolves `requested` against the supported precisions.
    pub fn probe(backend: &dyn GpuBackend, requested: Precision) -> Self {
        let precision = resolve_precision(backend, requested);
        let limit = |limit: Limit| usize::try_from(backend.limit(limit)).unwrap_or(0);

        Self {
            precision,
            max_textures: limit(Limit::MaxTextureImageUnits),
            max_vertex_textures: limit(Limit::MaxVertexTextureImageUnits),
            max_texture_size: limit(Limit::MaxTextureSize),
            max_cubemap_size: limit(Limit::MaxCubeMapTextureSize),
            max_attributes: limit(Limit::MaxVertexAttribs),
            max_vertex_uniforms: limit(Limit::MaxVertexUniformVectors),
            max_varyings: limit(Limit::MaxVaryingVectors),
            max_fragment_uniforms: limit(Limit::MaxFragmentUniformVectors),
        }
    }
}

impl Extensions {
    /// Generation 2 provides everything natively; generation 1 asks for the
    /// matching extension objects.
    pub fn probe(backend: &dyn GpuBackend) -> Self {
        let support = |extension: Extension| match backend.generation() {
            Generation::Gen2 => Some(ExtensionSupport::Core),
            Generation::Gen1 => backend
                .enable_extension(extension)
                .then_some(ExtensionSupport::Extension(extension.name())),
        };

        Self {
            vertex_array_object: support(Extension::VertexArrayObject),
            instanced_arrays: support(Extension::InstancedArrays),
            float_textures: support(Extension::TextureFloat),
        }
    }
}

fn supported_in_both_stages(backend: &dyn GpuBackend, precision: Precision) -> bool {
    backend.shader_precision(ShaderStage::Vertex, precision) > 0
        && backend.shader_precision(ShaderStage::Fragment, precision) > 0
}

fn resolve_precision(backend: &dyn GpuBackend, requested: Precision) -> Precision {
    let mut candidate = requested;
    loop {
        if supported_in_both_stages(backend, candidate) {
            break;
        }
        match candidate.lower() {
            Some(lower) => candidate = lower,
            // lowp is mandatory in GLSL ES, trust it even if the query lied.
            None => break,
        }
    }

    if candidate != requested {
        log::warn!("{requested} float precision is not supported, using {candidate} instead");
    }
    candidate
}
