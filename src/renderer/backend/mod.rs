//! GPU Backend
//!
//! [`GpuBackend`] is the narrow call surface the rest of the crate issues GPU
//! work through. Two web implementations sit behind it (one per WebGL
//! generation) plus a [`HeadlessBackend`](headless::HeadlessBackend) that
//! records calls instead of executing them.
//!
//! All methods take `&self`: implementations keep their GPU object tables
//! behind interior mutability, which matches the single-threaded,
//! frame-driven usage of a WebGL context.
//!
//! GPU objects never leave the backend. Callers hold the opaque slotmap keys
//! declared below.

pub mod headless;

#[cfg(target_arch = "wasm32")]
pub mod web;

use bitflags::bitflags;
use slotmap::new_key_type;

use crate::renderer::capabilities::Precision;
use crate::renderer::context::Generation;
use crate::resources::uniforms::UniformValue;

new_key_type! {
    /// A vertex, index or uniform buffer.
    pub struct BufferHandle;
    /// A single compiled (or failed) shader stage.
    pub struct ShaderHandle;
    /// A program object.
    pub struct ProgramHandle;
    /// A 2D, cube or 3D texture.
    pub struct TextureHandle;
    /// A vertex-array object.
    pub struct VertexArrayHandle;
    /// A framebuffer object.
    pub struct FramebufferHandle;
    /// A renderbuffer object.
    pub struct RenderbufferHandle;
    /// A resolved uniform location, only valid for the program it came from.
    pub struct UniformLocation;
}

// ============================================================================
// GL enumerations
// ============================================================================

/// Programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ShaderStage {
    Vertex = 0x8B31,
    Fragment = 0x8B30,
}

impl ShaderStage {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum BufferTarget {
    Array = 0x8892,
    ElementArray = 0x8893,
    Uniform = 0x8A11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum BufferUsage {
    #[default]
    Static = 0x88E4,
    Dynamic = 0x88E8,
}

/// Numeric limits queried by the capability prober.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Limit {
    MaxTextureImageUnits = 0x8872,
    MaxVertexTextureImageUnits = 0x8B4C,
    MaxTextureSize = 0x0D33,
    MaxCubeMapTextureSize = 0x851C,
    MaxVertexAttribs = 0x8869,
    MaxVertexUniformVectors = 0x8DFB,
    MaxVaryingVectors = 0x8DFC,
    MaxFragmentUniformVectors = 0x8DFD,
}

/// Optional WebGL1 extensions this crate cares about.
///
/// On WebGL2 all three are core features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    VertexArrayObject,
    InstancedArrays,
    TextureFloat,
}

impl Extension {
    /// Registry name passed to `getExtension`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::VertexArrayObject => "OES_vertex_array_object",
            Self::InstancedArrays => "ANGLE_instanced_arrays",
            Self::TextureFloat => "OES_texture_float",
        }
    }
}

/// Server-side capabilities toggled with `enable` / `disable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Capability {
    CullFace = 0x0B44,
    Blend = 0x0BE2,
    DepthTest = 0x0B71,
    ScissorTest = 0x0C11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CullFace {
    Front = 0x0404,
    Back = 0x0405,
    FrontAndBack = 0x0408,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum BlendFactor {
    Zero = 0,
    One = 1,
    SrcColor = 0x0300,
    OneMinusSrcColor = 0x0301,
    SrcAlpha = 0x0302,
    OneMinusSrcAlpha = 0x0303,
    DstAlpha = 0x0304,
    OneMinusDstAlpha = 0x0305,
    DstColor = 0x0306,
    OneMinusDstColor = 0x0307,
}

/// Primitive topology, passed verbatim to the draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum DrawMode {
    Points = 0,
    Lines = 1,
    LineLoop = 2,
    LineStrip = 3,
    #[default]
    Triangles = 4,
}

bitflags! {
    /// Buffers cleared by [`GpuBackend::clear`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearMask: u32 {
        const DEPTH = 0x0100;
        const STENCIL = 0x0400;
        const COLOR = 0x4000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TextureTarget {
    Texture2d = 0x0DE1,
    CubeMap = 0x8513,
    Texture3d = 0x806F,
}

/// Destination of a 2D image upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageTarget {
    Texture2d,
    /// Cube face in `+X, -X, +Y, -Y, +Z, -Z` order.
    CubeFace(u8),
}

impl ImageTarget {
    #[must_use]
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Texture2d => TextureTarget::Texture2d as u32,
            Self::CubeFace(face) => 0x8515 + u32::from(face.min(5)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TextureFilter {
    Nearest = 0x2600,
    Linear = 0x2601,
    LinearMipmapLinear = 0x2703,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TextureWrap {
    Repeat = 0x2901,
    ClampToEdge = 0x812F,
    MirroredRepeat = 0x8370,
}

/// One `texParameteri` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureParameter {
    MagFilter(TextureFilter),
    MinFilter(TextureFilter),
    WrapS(TextureWrap),
    WrapT(TextureWrap),
    WrapR(TextureWrap),
    BaseLevel(i32),
    MaxLevel(i32),
}

impl TextureParameter {
    #[must_use]
    pub fn pname(self) -> u32 {
        match self {
            Self::MagFilter(_) => 0x2800,
            Self::MinFilter(_) => 0x2801,
            Self::WrapS(_) => 0x2802,
            Self::WrapT(_) => 0x2803,
            Self::WrapR(_) => 0x8072,
            Self::BaseLevel(_) => 0x813C,
            Self::MaxLevel(_) => 0x813D,
        }
    }

    #[must_use]
    pub fn value(self) -> i32 {
        match self {
            Self::MagFilter(f) | Self::MinFilter(f) => f as i32,
            Self::WrapS(w) | Self::WrapT(w) | Self::WrapR(w) => w as i32,
            Self::BaseLevel(v) | Self::MaxLevel(v) => v,
        }
    }
}

/// Texel layouts used by the texture resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// `RGBA` / `UNSIGNED_BYTE`.
    Rgba8,
    /// `RGBA16F` / `FLOAT`, generation 2 only.
    Rgba16Float,
    /// `R8` / `UNSIGNED_BYTE`, generation 2 only.
    R8,
}

impl PixelFormat {
    /// `(internal format, format, type)` triple.
    #[must_use]
    pub fn gl_enums(self) -> (i32, u32, u32) {
        match self {
            Self::Rgba8 => (0x1908, 0x1908, 0x1401),
            Self::Rgba16Float => (0x881A, 0x1908, 0x1406),
            Self::R8 => (0x8229, 0x1903, 0x1401),
        }
    }

    #[must_use]
    pub fn bytes_per_texel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Rgba16Float => 16,
            Self::R8 => 1,
        }
    }
}

// ============================================================================
// Backend trait
// ============================================================================

/// The WebGL call surface.
///
/// Methods that only exist on one generation are still part of the trait;
/// the generation-1 backend turns unsupported ones into logged no-ops so a
/// caller that forgot to branch on [`Generation`] degrades instead of
/// crashing.
pub trait GpuBackend {
    fn generation(&self) -> Generation;

    // --- Probing --------------------------------------------------------------

    /// Precision bits of `precision` floats in `stage`, 0 when unsupported.
    fn shader_precision(&self, stage: ShaderStage, precision: Precision) -> i32;
    fn limit(&self, limit: Limit) -> i32;
    /// Enables `extension` and reports whether it is available.
    fn enable_extension(&self, extension: Extension) -> bool;
    fn drawing_buffer_size(&self) -> (i32, i32);
    /// Resizes the backing surface to `width`x`height` device pixels.
    fn resize_drawing_buffer(&self, width: i32, height: i32);

    // --- Buffers --------------------------------------------------------------

    fn create_buffer(&self) -> Option<BufferHandle>;
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferHandle>);
    /// Allocates and fills the buffer bound to `target`.
    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    fn buffer_sub_data(&self, target: BufferTarget, offset: i32, data: &[u8]);
    fn bind_buffer_base(&self, target: BufferTarget, index: u32, buffer: Option<BufferHandle>);
    fn delete_buffer(&self, buffer: BufferHandle);

    // --- Shaders & programs ---------------------------------------------------

    fn create_shader(&self, stage: ShaderStage) -> Option<ShaderHandle>;
    fn shader_source(&self, shader: ShaderHandle, source: &str);
    fn compile_shader(&self, shader: ShaderHandle);
    fn shader_compile_status(&self, shader: ShaderHandle) -> bool;
    fn shader_info_log(&self, shader: ShaderHandle) -> String;
    fn delete_shader(&self, shader: ShaderHandle);

    fn create_program(&self) -> Option<ProgramHandle>;
    fn attach_shader(&self, program: ProgramHandle, shader: ShaderHandle);
    fn detach_shader(&self, program: ProgramHandle, shader: ShaderHandle);
    fn transform_feedback_varyings(&self, program: ProgramHandle, varyings: &[String]);
    fn link_program(&self, program: ProgramHandle);
    fn validate_program(&self, program: ProgramHandle);
    fn program_link_status(&self, program: ProgramHandle) -> bool;
    fn program_info_log(&self, program: ProgramHandle) -> String;
    fn use_program(&self, program: Option<ProgramHandle>);
    fn delete_program(&self, program: ProgramHandle);

    // --- Attributes & uniforms ------------------------------------------------

    /// Attribute slot, or `-1` when the program has no such active attribute.
    fn attrib_location(&self, program: ProgramHandle, name: &str) -> i32;
    fn enable_vertex_attrib_array(&self, index: u32);
    fn disable_vertex_attrib_array(&self, index: u32);
    /// Float attribute pointer into the bound array buffer.
    fn vertex_attrib_pointer(&self, index: u32, size: i32, stride: i32, offset: i32);
    fn vertex_attrib_divisor(&self, index: u32, divisor: u32);

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;
    /// Uploads one value, picking the upload call from the value's type.
    ///
    /// Sampler values are not uploaded here; materials upload the texture
    /// unit as an integer and bind the texture separately.
    fn upload_uniform(&self, location: UniformLocation, value: &UniformValue);
    fn uniform_block_index(&self, program: ProgramHandle, name: &str) -> Option<u32>;
    fn uniform_block_binding(&self, program: ProgramHandle, block_index: u32, binding: u32);

    // --- Fixed-function state -------------------------------------------------

    fn enable(&self, capability: Capability);
    fn disable(&self, capability: Capability);
    fn cull_face(&self, face: CullFace);
    fn blend_func(&self, src: BlendFactor, dst: BlendFactor);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn scissor(&self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&self, mask: ClearMask);

    // --- Vertex arrays --------------------------------------------------------

    fn create_vertex_array(&self) -> Option<VertexArrayHandle>;
    fn bind_vertex_array(&self, vao: Option<VertexArrayHandle>);
    fn delete_vertex_array(&self, vao: VertexArrayHandle);

    // --- Draw calls -----------------------------------------------------------

    fn draw_arrays(&self, mode: DrawMode, first: i32, count: i32);
    /// Indexed draw with `UNSIGNED_SHORT` indices.
    fn draw_elements(&self, mode: DrawMode, count: i32, offset: i32);
    fn draw_arrays_instanced(&self, mode: DrawMode, first: i32, count: i32, instances: i32);
    fn draw_elements_instanced(&self, mode: DrawMode, count: i32, offset: i32, instances: i32);

    // --- Textures -------------------------------------------------------------

    fn create_texture(&self) -> Option<TextureHandle>;
    /// Selects texture unit `unit` (0-based).
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, target: TextureTarget, texture: Option<TextureHandle>);
    fn tex_parameter(&self, target: TextureTarget, parameter: TextureParameter);
    fn tex_image_2d(
        &self,
        target: ImageTarget,
        width: i32,
        height: i32,
        format: PixelFormat,
        data: Option<&[u8]>,
    );
    fn tex_image_3d(
        &self,
        width: i32,
        height: i32,
        depth: i32,
        format: PixelFormat,
        data: Option<&[u8]>,
    );
    fn pixel_store_flip_y(&self, flip: bool);
    fn generate_mipmap(&self, target: TextureTarget);
    fn delete_texture(&self, texture: TextureHandle);

    // --- Framebuffers ---------------------------------------------------------

    fn create_framebuffer(&self) -> Option<FramebufferHandle>;
    fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>);
    /// Attaches a 2D texture as `COLOR_ATTACHMENT0` of the bound framebuffer.
    fn framebuffer_color_texture(&self, texture: Option<TextureHandle>);
    fn create_renderbuffer(&self) -> Option<RenderbufferHandle>;
    fn bind_renderbuffer(&self, renderbuffer: Option<RenderbufferHandle>);
    /// `DEPTH_COMPONENT16` storage for the bound renderbuffer.
    fn renderbuffer_depth_storage(&self, width: i32, height: i32);
    /// Attaches a renderbuffer as `DEPTH_ATTACHMENT` of the bound framebuffer.
    fn framebuffer_depth_renderbuffer(&self, renderbuffer: Option<RenderbufferHandle>);
    fn delete_framebuffer(&self, framebuffer: FramebufferHandle);
    fn delete_renderbuffer(&self, renderbuffer: RenderbufferHandle);
}
