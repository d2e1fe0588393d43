//! Web Backends
//!
//! [`WebGlBackend`] drives a `WebGLRenderingContext` (generation 1) and
//! [`WebGl2Backend`] a `WebGL2RenderingContext` (generation 2). Both map the
//! opaque handles of [`GpuBackend`] onto the JS objects through slotmaps.
//!
//! Calls whose signature is the same on both contexts are generated by
//! `shared_gl_calls!`; everything below the macro is where the two
//! generations diverge:
//!
//! - `bufferData` takes a trailing source offset on generation 2
//! - vertex arrays and instancing go through `OES_vertex_array_object` and
//!   `ANGLE_instanced_arrays` on generation 1
//! - uniform blocks, 3D textures and transform feedback only exist on
//!   generation 2 and are logged no-ops on generation 1

use std::cell::RefCell;

use slotmap::SlotMap;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    AngleInstancedArrays, HtmlCanvasElement, OesVertexArrayObject, WebGl2RenderingContext,
    WebGlBuffer, WebGlContextAttributes, WebGlFramebuffer, WebGlProgram, WebGlRenderbuffer,
    WebGlRenderingContext, WebGlShader, WebGlTexture, WebGlUniformLocation,
    WebGlVertexArrayObject,
};

use crate::renderer::backend::{
    BlendFactor, BufferHandle, BufferTarget, BufferUsage, Capability, ClearMask, CullFace,
    DrawMode, Extension, FramebufferHandle, GpuBackend, ImageTarget, Limit, PixelFormat,
    ProgramHandle, RenderbufferHandle, ShaderHandle, ShaderStage, TextureHandle,
    TextureParameter, TextureTarget, UniformLocation, VertexArrayHandle,
};
use crate::renderer::capabilities::Precision;
use crate::renderer::context::Generation;
use crate::renderer::settings::RendererSettings;
use crate::resources::uniforms::UniformValue;

// Enums shared by both context kinds.
const FLOAT: u32 = 0x1406;
const UNSIGNED_SHORT: u32 = 0x1403;
const COMPILE_STATUS: u32 = 0x8B81;
const LINK_STATUS: u32 = 0x8B82;
const TEXTURE0: u32 = 0x84C0;
const UNPACK_FLIP_Y_WEBGL: u32 = 0x9240;
const FRAMEBUFFER: u32 = 0x8D40;
const RENDERBUFFER: u32 = 0x8D41;
const COLOR_ATTACHMENT0: u32 = 0x8CE0;
const DEPTH_ATTACHMENT: u32 = 0x8D00;
const DEPTH_COMPONENT16: u32 = 0x81A5;
const SEPARATE_ATTRIBS: u32 = 0x8C8D;
const INVALID_INDEX: u32 = 0xFFFF_FFFF;
const RGBA: i32 = 0x1908;

/// JS objects behind the opaque handles.
#[derive(Default)]
struct GlObjects {
    buffers: RefCell<SlotMap<BufferHandle, WebGlBuffer>>,
    shaders: RefCell<SlotMap<ShaderHandle, WebGlShader>>,
    programs: RefCell<SlotMap<ProgramHandle, WebGlProgram>>,
    uniform_locations: RefCell<SlotMap<UniformLocation, (ProgramHandle, WebGlUniformLocation)>>,
    textures: RefCell<SlotMap<TextureHandle, WebGlTexture>>,
    vertex_arrays: RefCell<SlotMap<VertexArrayHandle, WebGlVertexArrayObject>>,
    framebuffers: RefCell<SlotMap<FramebufferHandle, WebGlFramebuffer>>,
    renderbuffers: RefCell<SlotMap<RenderbufferHandle, WebGlRenderbuffer>>,
}

fn get<K: slotmap::Key, V: Clone>(map: &RefCell<SlotMap<K, V>>, key: K) -> Option<V> {
    map.borrow().get(key).cloned()
}

fn get_opt<K: slotmap::Key, V: Clone>(map: &RefCell<SlotMap<K, V>>, key: Option<K>) -> Option<V> {
    key.and_then(|key| get(map, key))
}

fn context_attributes(settings: &RendererSettings) -> WebGlContextAttributes {
    let attributes = WebGlContextAttributes::new();
    attributes.set_antialias(settings.antialias);
    attributes.set_preserve_drawing_buffer(settings.preserve_drawing_buffer);
    attributes
}

fn request_context<T: JsCast>(
    canvas: &HtmlCanvasElement,
    generation: Generation,
    settings: &RendererSettings,
) -> Option<T> {
    let attributes = context_attributes(settings);
    match canvas.get_context_with_context_options(generation.context_name(), &attributes) {
        Ok(Some(context)) => context.dyn_into::<T>().ok(),
        Ok(None) => None,
        Err(e) => {
            log::warn!("getContext({}) threw: {e:?}", generation.context_name());
            None
        }
    }
}

fn float_view(data: &[u8]) -> js_sys::Float32Array {
    let floats: Vec<f32> = bytemuck::pod_collect_to_vec(data);
    js_sys::Float32Array::from(floats.as_slice())
}

/// Calls with identical signatures on both context kinds.
macro_rules! shared_gl_calls {
    () => {
        fn shader_precision(&self, stage: ShaderStage, precision: Precision) -> i32 {
            self.gl
                .get_shader_precision_format(stage as u32, precision.gl_enum())
                .map_or(0, |format| format.precision())
        }

        fn limit(&self, limit: Limit) -> i32 {
            self.gl
                .get_parameter(limit as u32)
                .ok()
                .and_then(|value| value.as_f64())
                .map_or(0, |value| value as i32)
        }

        fn drawing_buffer_size(&self) -> (i32, i32) {
            (self.gl.drawing_buffer_width(), self.gl.drawing_buffer_height())
        }

        fn resize_drawing_buffer(&self, width: i32, height: i32) {
            let canvas = self
                .gl
                .canvas()
                .and_then(|canvas| canvas.dyn_into::<HtmlCanvasElement>().ok());
            match canvas {
                Some(canvas) => {
                    canvas.set_width(u32::try_from(width).unwrap_or(1));
                    canvas.set_height(u32::try_from(height).unwrap_or(1));
                }
                None => log::warn!("Context has no HTML canvas to resize"),
            }
        }

        // --- Buffers ----------------------------------------------------------

        fn create_buffer(&self) -> Option<BufferHandle> {
            let buffer = self.gl.create_buffer()?;
            Some(self.objects.buffers.borrow_mut().insert(buffer))
        }

        fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferHandle>) {
            let buffer = get_opt(&self.objects.buffers, buffer);
            self.gl.bind_buffer(target as u32, buffer.as_ref());
        }

        fn buffer_sub_data(&self, target: BufferTarget, offset: i32, data: &[u8]) {
            self.gl
                .buffer_sub_data_with_i32_and_u8_array(target as u32, offset, data);
        }

        fn delete_buffer(&self, buffer: BufferHandle) {
            let buffer = self.objects.buffers.borrow_mut().remove(buffer);
            self.gl.delete_buffer(buffer.as_ref());
        }

        // --- Shaders & programs -----------------------------------------------

        fn create_shader(&self, stage: ShaderStage) -> Option<ShaderHandle> {
            let shader = self.gl.create_shader(stage as u32)?;
            Some(self.objects.shaders.borrow_mut().insert(shader))
        }

        fn shader_source(&self, shader: ShaderHandle, source: &str) {
            if let Some(shader) = get(&self.objects.shaders, shader) {
                self.gl.shader_source(&shader, source);
            }
        }

        fn compile_shader(&self, shader: ShaderHandle) {
            if let Some(shader) = get(&self.objects.shaders, shader) {
                self.gl.compile_shader(&shader);
            }
        }

        fn shader_compile_status(&self, shader: ShaderHandle) -> bool {
            get(&self.objects.shaders, shader).is_some_and(|shader| {
                self.gl
                    .get_shader_parameter(&shader, COMPILE_STATUS)
                    .as_bool()
                    .unwrap_or(false)
            })
        }

        fn shader_info_log(&self, shader: ShaderHandle) -> String {
            get(&self.objects.shaders, shader)
                .and_then(|shader| self.gl.get_shader_info_log(&shader))
                .unwrap_or_default()
        }

        fn delete_shader(&self, shader: ShaderHandle) {
            let shader = self.objects.shaders.borrow_mut().remove(shader);
            self.gl.delete_shader(shader.as_ref());
        }

        fn create_program(&self) -> Option<ProgramHandle> {
            let program = self.gl.create_program()?;
            Some(self.objects.programs.borrow_mut().insert(program))
        }

        fn attach_shader(&self, program: ProgramHandle, shader: ShaderHandle) {
            if let (Some(program), Some(shader)) = (
                get(&self.objects.programs, program),
                get(&self.objects.shaders, shader),
            ) {
                self.gl.attach_shader(&program, &shader);
            }
        }

        fn detach_shader(&self, program: ProgramHandle, shader: ShaderHandle) {
            if let (Some(program), Some(shader)) = (
                get(&self.objects.programs, program),
                get(&self.objects.shaders, shader),
            ) {
                self.gl.detach_shader(&program, &shader);
            }
        }

        fn link_program(&self, program: ProgramHandle) {
            if let Some(program) = get(&self.objects.programs, program) {
                self.gl.link_program(&program);
            }
        }

        fn validate_program(&self, program: ProgramHandle) {
            if let Some(program) = get(&self.objects.programs, program) {
                self.gl.validate_program(&program);
            }
        }

        fn program_link_status(&self, program: ProgramHandle) -> bool {
            get(&self.objects.programs, program).is_some_and(|program| {
                self.gl
                    .get_program_parameter(&program, LINK_STATUS)
                    .as_bool()
                    .unwrap_or(false)
            })
        }

        fn program_info_log(&self, program: ProgramHandle) -> String {
            get(&self.objects.programs, program)
                .and_then(|program| self.gl.get_program_info_log(&program))
                .unwrap_or_default()
        }

        fn use_program(&self, program: Option<ProgramHandle>) {
            let program = get_opt(&self.objects.programs, program);
            self.gl.use_program(program.as_ref());
        }

        fn delete_program(&self, program: ProgramHandle) {
            self.objects
                .uniform_locations
                .borrow_mut()
                .retain(|_, (owner, _)| *owner != program);
            let program = self.objects.programs.borrow_mut().remove(program);
            self.gl.delete_program(program.as_ref());
        }

        // --- Attributes & uniforms --------------------------------------------

        fn attrib_location(&self, program: ProgramHandle, name: &str) -> i32 {
            get(&self.objects.programs, program)
                .map_or(-1, |program| self.gl.get_attrib_location(&program, name))
        }

        fn enable_vertex_attrib_array(&self, index: u32) {
            self.gl.enable_vertex_attrib_array(index);
        }

        fn disable_vertex_attrib_array(&self, index: u32) {
            self.gl.disable_vertex_attrib_array(index);
        }

        fn vertex_attrib_pointer(&self, index: u32, size: i32, stride: i32, offset: i32) {
            self.gl
                .vertex_attrib_pointer_with_i32(index, size, FLOAT, false, stride, offset);
        }

        fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
            let js_program = get(&self.objects.programs, program)?;
            let location = self.gl.get_uniform_location(&js_program, name)?;
            Some(
                self.objects
                    .uniform_locations
                    .borrow_mut()
                    .insert((program, location)),
            )
        }

        fn upload_uniform(&self, location: UniformLocation, value: &UniformValue) {
            let Some((_, location)) = get(&self.objects.uniform_locations, location) else {
                return;
            };
            let location = Some(&location);
            let gl = &self.gl;
            match value {
                UniformValue::Int(v) => gl.uniform1i(location, *v),
                UniformValue::Float(v) => gl.uniform1f(location, *v),
                UniformValue::Vec2(v) => gl.uniform2f(location, v.x, v.y),
                UniformValue::Vec3(v) => gl.uniform3f(location, v.x, v.y, v.z),
                UniformValue::Vec4(v) => gl.uniform4f(location, v.x, v.y, v.z, v.w),
                UniformValue::IntArray(v) => gl.uniform1iv_with_i32_array(location, v),
                UniformValue::IVec2Array(v) => gl.uniform2iv_with_i32_array(location, v),
                UniformValue::FloatArray(v) => gl.uniform1fv_with_f32_array(location, v),
                UniformValue::Vec2Array(v) => gl.uniform2fv_with_f32_array(location, v),
                UniformValue::Vec3Array(v) => gl.uniform3fv_with_f32_array(location, v),
                UniformValue::Vec4Array(v) => gl.uniform4fv_with_f32_array(location, v),
                UniformValue::Mat3(m) => {
                    gl.uniform_matrix3fv_with_f32_array(location, false, &m.to_cols_array());
                }
                UniformValue::Mat4(m) => {
                    gl.uniform_matrix4fv_with_f32_array(location, false, &m.to_cols_array());
                }
                UniformValue::Texture(_)
                | UniformValue::TextureCube(_)
                | UniformValue::Texture3d(_) => {}
            }
        }

        // --- Fixed-function state ---------------------------------------------

        fn enable(&self, capability: Capability) {
            self.gl.enable(capability as u32);
        }

        fn disable(&self, capability: Capability) {
            self.gl.disable(capability as u32);
        }

        fn cull_face(&self, face: CullFace) {
            self.gl.cull_face(face as u32);
        }

        fn blend_func(&self, src: BlendFactor, dst: BlendFactor) {
            self.gl.blend_func(src as u32, dst as u32);
        }

        fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
            self.gl.viewport(x, y, width, height);
        }

        fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
            self.gl.scissor(x, y, width, height);
        }

        fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
            self.gl.clear_color(r, g, b, a);
        }

        fn clear(&self, mask: ClearMask) {
            self.gl.clear(mask.bits());
        }

        // --- Draw calls -------------------------------------------------------

        fn draw_arrays(&self, mode: DrawMode, first: i32, count: i32) {
            self.gl.draw_arrays(mode as u32, first, count);
        }

        fn draw_elements(&self, mode: DrawMode, count: i32, offset: i32) {
            self.gl
                .draw_elements_with_i32(mode as u32, count, UNSIGNED_SHORT, offset);
        }

        // --- Textures ---------------------------------------------------------

        fn create_texture(&self) -> Option<TextureHandle> {
            let texture = self.gl.create_texture()?;
            Some(self.objects.textures.borrow_mut().insert(texture))
        }

        fn active_texture(&self, unit: u32) {
            self.gl.active_texture(TEXTURE0 + unit);
        }

        fn bind_texture(&self, target: TextureTarget, texture: Option<TextureHandle>) {
            let texture = get_opt(&self.objects.textures, texture);
            self.gl.bind_texture(target as u32, texture.as_ref());
        }

        fn pixel_store_flip_y(&self, flip: bool) {
            self.gl.pixel_storei(UNPACK_FLIP_Y_WEBGL, i32::from(flip));
        }

        fn generate_mipmap(&self, target: TextureTarget) {
            self.gl.generate_mipmap(target as u32);
        }

        fn delete_texture(&self, texture: TextureHandle) {
            let texture = self.objects.textures.borrow_mut().remove(texture);
            self.gl.delete_texture(texture.as_ref());
        }

        // --- Framebuffers -----------------------------------------------------

        fn create_framebuffer(&self) -> Option<FramebufferHandle> {
            let framebuffer = self.gl.create_framebuffer()?;
            Some(self.objects.framebuffers.borrow_mut().insert(framebuffer))
        }

        fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>) {
            let framebuffer = get_opt(&self.objects.framebuffers, framebuffer);
            self.gl.bind_framebuffer(FRAMEBUFFER, framebuffer.as_ref());
        }

        fn framebuffer_color_texture(&self, texture: Option<TextureHandle>) {
            let texture = get_opt(&self.objects.textures, texture);
            self.gl.framebuffer_texture_2d(
                FRAMEBUFFER,
                COLOR_ATTACHMENT0,
                TextureTarget::Texture2d as u32,
                texture.as_ref(),
                0,
            );
        }

        fn create_renderbuffer(&self) -> Option<RenderbufferHandle> {
            let renderbuffer = self.gl.create_renderbuffer()?;
            Some(self.objects.renderbuffers.borrow_mut().insert(renderbuffer))
        }

        fn bind_renderbuffer(&self, renderbuffer: Option<RenderbufferHandle>) {
            let renderbuffer = get_opt(&self.objects.renderbuffers, renderbuffer);
            self.gl.bind_renderbuffer(RENDERBUFFER, renderbuffer.as_ref());
        }

        fn renderbuffer_depth_storage(&self, width: i32, height: i32) {
            self.gl
                .renderbuffer_storage(RENDERBUFFER, DEPTH_COMPONENT16, width, height);
        }

        fn framebuffer_depth_renderbuffer(&self, renderbuffer: Option<RenderbufferHandle>) {
            let renderbuffer = get_opt(&self.objects.renderbuffers, renderbuffer);
            self.gl.framebuffer_renderbuffer(
                FRAMEBUFFER,
                DEPTH_ATTACHMENT,
                RENDERBUFFER,
                renderbuffer.as_ref(),
            );
        }

        fn delete_framebuffer(&self, framebuffer: FramebufferHandle) {
            let framebuffer = self.objects.framebuffers.borrow_mut().remove(framebuffer);
            self.gl.delete_framebuffer(framebuffer.as_ref());
        }

        fn delete_renderbuffer(&self, renderbuffer: RenderbufferHandle) {
            let renderbuffer = self.objects.renderbuffers.borrow_mut().remove(renderbuffer);
            self.gl.delete_renderbuffer(renderbuffer.as_ref());
        }
    };
}

// ============================================================================
// Generation 1
// ============================================================================

#[derive(Default)]
struct Gen1Extensions {
    vertex_array_object: Option<OesVertexArrayObject>,
    instanced_arrays: Option<AngleInstancedArrays>,
    float_textures: bool,
}

/// `WebGLRenderingContext` backend.
pub struct WebGlBackend {
    gl: WebGlRenderingContext,
    objects: GlObjects,
    extensions: RefCell<Gen1Extensions>,
}

impl WebGlBackend {
    #[must_use]
    pub fn new(gl: WebGlRenderingContext) -> Self {
        Self {
            gl,
            objects: GlObjects::default(),
            extensions: RefCell::default(),
        }
    }

    /// Requests a `"webgl"` context from `canvas`.
    #[must_use]
    pub fn from_canvas(canvas: &HtmlCanvasElement, settings: &RendererSettings) -> Option<Self> {
        request_context::<WebGlRenderingContext>(canvas, Generation::Gen1, settings).map(Self::new)
    }

    #[must_use]
    pub fn context(&self) -> &WebGlRenderingContext {
        &self.gl
    }

    fn extension_object<T: JsCast>(&self, name: &str) -> Option<T> {
        match self.gl.get_extension(name) {
            Ok(Some(object)) => Some(object.unchecked_into::<T>()),
            Ok(None) => None,
            Err(e) => {
                log::warn!("getExtension({name}) threw: {e:?}");
                None
            }
        }
    }

    fn warn_gen2_only(call: &str) {
        log::warn!("{call} requires a WebGL2 context, ignoring");
    }
}

impl GpuBackend for WebGlBackend {
    fn generation(&self) -> Generation {
        Generation::Gen1
    }

    shared_gl_calls!();

    fn enable_extension(&self, extension: Extension) -> bool {
        let mut extensions = self.extensions.borrow_mut();
        match extension {
            Extension::VertexArrayObject => {
                extensions.vertex_array_object = self.extension_object(extension.name());
                extensions.vertex_array_object.is_some()
            }
            Extension::InstancedArrays => {
                extensions.instanced_arrays = self.extension_object(extension.name());
                extensions.instanced_arrays.is_some()
            }
            Extension::TextureFloat => {
                extensions.float_textures = self
                    .extension_object::<js_sys::Object>(extension.name())
                    .is_some();
                extensions.float_textures
            }
        }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        self.gl
            .buffer_data_with_u8_array(target as u32, data, usage as u32);
    }

    fn bind_buffer_base(&self, _target: BufferTarget, _index: u32, _buffer: Option<BufferHandle>) {
        Self::warn_gen2_only("bindBufferBase");
    }

    fn transform_feedback_varyings(&self, _program: ProgramHandle, _varyings: &[String]) {
        Self::warn_gen2_only("transformFeedbackVaryings");
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        match &self.extensions.borrow().instanced_arrays {
            Some(ext) => ext.vertex_attrib_divisor_angle(index, divisor),
            None => log::warn!("vertexAttribDivisor requires ANGLE_instanced_arrays"),
        }
    }

    fn uniform_block_index(&self, _program: ProgramHandle, _name: &str) -> Option<u32> {
        Self::warn_gen2_only("getUniformBlockIndex");
        None
    }

    fn uniform_block_binding(&self, _program: ProgramHandle, _block_index: u32, _binding: u32) {
        Self::warn_gen2_only("uniformBlockBinding");
    }

    fn create_vertex_array(&self) -> Option<VertexArrayHandle> {
        let vao = self
            .extensions
            .borrow()
            .vertex_array_object
            .as_ref()?
            .create_vertex_array_oes()?;
        Some(self.objects.vertex_arrays.borrow_mut().insert(vao))
    }

    fn bind_vertex_array(&self, vao: Option<VertexArrayHandle>) {
        if let Some(ext) = &self.extensions.borrow().vertex_array_object {
            let vao = get_opt(&self.objects.vertex_arrays, vao);
            ext.bind_vertex_array_oes(vao.as_ref());
        }
    }

    fn delete_vertex_array(&self, vao: VertexArrayHandle) {
        let vao = self.objects.vertex_arrays.borrow_mut().remove(vao);
        if let Some(ext) = &self.extensions.borrow().vertex_array_object {
            ext.delete_vertex_array_oes(vao.as_ref());
        }
    }

    fn draw_arrays_instanced(&self, mode: DrawMode, first: i32, count: i32, instances: i32) {
        match &self.extensions.borrow().instanced_arrays {
            Some(ext) => ext.draw_arrays_instanced_angle(mode as u32, first, count, instances),
            None => log::warn!("Instanced drawing requires ANGLE_instanced_arrays"),
        }
    }

    fn draw_elements_instanced(&self, mode: DrawMode, count: i32, offset: i32, instances: i32) {
        match &self.extensions.borrow().instanced_arrays {
            Some(ext) => ext.draw_elements_instanced_angle_with_i32(
                mode as u32,
                count,
                UNSIGNED_SHORT,
                offset,
                instances,
            ),
            None => log::warn!("Instanced drawing requires ANGLE_instanced_arrays"),
        }
    }

    fn tex_parameter(&self, target: TextureTarget, parameter: TextureParameter) {
        if target == TextureTarget::Texture3d {
            Self::warn_gen2_only("3D textures");
            return;
        }
        self.gl
            .tex_parameteri(target as u32, parameter.pname(), parameter.value());
    }

    fn tex_image_2d(
        &self,
        target: ImageTarget,
        width: i32,
        height: i32,
        format: PixelFormat,
        data: Option<&[u8]>,
    ) {
        let (_, pixel_format, pixel_type) = format.gl_enums();
        // WebGL1 only knows unsized internal formats.
        let result = if pixel_type == FLOAT {
            let view = data.map(float_view);
            self.gl
                .tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_array_buffer_view(
                    target.gl_enum(),
                    0,
                    RGBA,
                    width,
                    height,
                    0,
                    pixel_format,
                    pixel_type,
                    view.as_deref(),
                )
        } else {
            self.gl
                .tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
                    target.gl_enum(),
                    0,
                    pixel_format as i32,
                    width,
                    height,
                    0,
                    pixel_format,
                    pixel_type,
                    data,
                )
        };
        if let Err(e) = result {
            log::warn!("texImage2D failed: {e:?}");
        }
    }

    fn tex_image_3d(
        &self,
        _width: i32,
        _height: i32,
        _depth: i32,
        _format: PixelFormat,
        _data: Option<&[u8]>,
    ) {
        Self::warn_gen2_only("texImage3D");
    }
}

// ============================================================================
// Generation 2
// ============================================================================

/// `WebGL2RenderingContext` backend.
pub struct WebGl2Backend {
    gl: WebGl2RenderingContext,
    objects: GlObjects,
}

impl WebGl2Backend {
    #[must_use]
    pub fn new(gl: WebGl2RenderingContext) -> Self {
        Self {
            gl,
            objects: GlObjects::default(),
        }
    }

    /// Requests a `"webgl2"` context from `canvas`.
    #[must_use]
    pub fn from_canvas(canvas: &HtmlCanvasElement, settings: &RendererSettings) -> Option<Self> {
        request_context::<WebGl2RenderingContext>(canvas, Generation::Gen2, settings)
            .map(Self::new)
    }

    #[must_use]
    pub fn context(&self) -> &WebGl2RenderingContext {
        &self.gl
    }
}

impl GpuBackend for WebGl2Backend {
    fn generation(&self) -> Generation {
        Generation::Gen2
    }

    shared_gl_calls!();

    fn enable_extension(&self, extension: Extension) -> bool {
        // Core on WebGL2; float render targets still need the color buffer
        // extension, which sampling does not.
        log::trace!("{} is core in WebGL2", extension.name());
        true
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let Ok(length) = u32::try_from(data.len()) else {
            log::error!("Buffer upload of {} bytes exceeds the WebGL limit", data.len());
            return;
        };
        self.gl.buffer_data_with_u8_array_and_src_offset_and_length(
            target as u32,
            data,
            usage as u32,
            0,
            length,
        );
    }

    fn bind_buffer_base(&self, target: BufferTarget, index: u32, buffer: Option<BufferHandle>) {
        let buffer = get_opt(&self.objects.buffers, buffer);
        self.gl.bind_buffer_base(target as u32, index, buffer.as_ref());
    }

    fn transform_feedback_varyings(&self, program: ProgramHandle, varyings: &[String]) {
        let Some(program) = get(&self.objects.programs, program) else {
            return;
        };
        let names: js_sys::Array = varyings.iter().map(|v| JsValue::from_str(v)).collect();
        self.gl
            .transform_feedback_varyings(&program, &names, SEPARATE_ATTRIBS);
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        self.gl.vertex_attrib_divisor(index, divisor);
    }

    fn uniform_block_index(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        let program = get(&self.objects.programs, program)?;
        let index = self.gl.get_uniform_block_index(&program, name);
        (index != INVALID_INDEX).then_some(index)
    }

    fn uniform_block_binding(&self, program: ProgramHandle, block_index: u32, binding: u32) {
        if let Some(program) = get(&self.objects.programs, program) {
            self.gl.uniform_block_binding(&program, block_index, binding);
        }
    }

    fn create_vertex_array(&self) -> Option<VertexArrayHandle> {
        let vao = self.gl.create_vertex_array()?;
        Some(self.objects.vertex_arrays.borrow_mut().insert(vao))
    }

    fn bind_vertex_array(&self, vao: Option<VertexArrayHandle>) {
        let vao = get_opt(&self.objects.vertex_arrays, vao);
        self.gl.bind_vertex_array(vao.as_ref());
    }

    fn delete_vertex_array(&self, vao: VertexArrayHandle) {
        let vao = self.objects.vertex_arrays.borrow_mut().remove(vao);
        self.gl.delete_vertex_array(vao.as_ref());
    }

    fn draw_arrays_instanced(&self, mode: DrawMode, first: i32, count: i32, instances: i32) {
        self.gl
            .draw_arrays_instanced(mode as u32, first, count, instances);
    }

    fn draw_elements_instanced(&self, mode: DrawMode, count: i32, offset: i32, instances: i32) {
        self.gl.draw_elements_instanced_with_i32(
            mode as u32,
            count,
            UNSIGNED_SHORT,
            offset,
            instances,
        );
    }

    fn tex_parameter(&self, target: TextureTarget, parameter: TextureParameter) {
        self.gl
            .tex_parameteri(target as u32, parameter.pname(), parameter.value());
    }

    fn tex_image_2d(
        &self,
        target: ImageTarget,
        width: i32,
        height: i32,
        format: PixelFormat,
        data: Option<&[u8]>,
    ) {
        let (internal_format, pixel_format, pixel_type) = format.gl_enums();
        let result = if pixel_type == FLOAT {
            let view = data.map(float_view);
            self.gl
                .tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_array_buffer_view(
                    target.gl_enum(),
                    0,
                    internal_format,
                    width,
                    height,
                    0,
                    pixel_format,
                    pixel_type,
                    view.as_deref(),
                )
        } else {
            self.gl
                .tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
                    target.gl_enum(),
                    0,
                    internal_format,
                    width,
                    height,
                    0,
                    pixel_format,
                    pixel_type,
                    data,
                )
        };
        if let Err(e) = result {
            log::warn!("texImage2D failed: {e:?}");
        }
    }

    fn tex_image_3d(
        &self,
        width: i32,
        height: i32,
        depth: i32,
        format: PixelFormat,
        data: Option<&[u8]>,
    ) {
        let (internal_format, pixel_format, pixel_type) = format.gl_enums();
        if let Err(e) = self.gl.tex_image_3d_with_opt_u8_array(
            TextureTarget::Texture3d as u32,
            0,
            internal_format,
            width,
            height,
            depth,
            0,
            pixel_format,
            pixel_type,
            data,
        ) {
            log::warn!("texImage3D failed: {e:?}");
        }
    }
}
