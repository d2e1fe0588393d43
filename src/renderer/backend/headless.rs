//! Headless Backend
//!
//! A [`GpuBackend`] that executes nothing and records everything. It keeps
//! just enough object state (buffers, shaders, programs, textures) to answer
//! the status queries the crate relies on, which makes the whole draw
//! protocol observable without a browser.
//!
//! The stand-in shader compiler accepts any source except one containing a
//! line that starts with `#error`; link failures are injected through
//! [`HeadlessOptions::fail_link`].
//!
//! [`HeadlessBackend`] is a cheap handle to shared state: keep a clone to
//! inspect the calls after the context took ownership of the other one.
//!
//! ```rust,ignore
//! let backend = HeadlessBackend::new(HeadlessOptions::webgl2());
//! let ctx = GpuContext::new(Box::new(backend.clone()), Precision::Highp);
//! // ... draw ...
//! assert_eq!(backend.draw_calls(), 1);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

use crate::renderer::backend::{
    BlendFactor, BufferHandle, BufferTarget, BufferUsage, Capability, ClearMask, CullFace,
    DrawMode, Extension, FramebufferHandle, GpuBackend, ImageTarget, Limit, PixelFormat,
    ProgramHandle, RenderbufferHandle, ShaderHandle, ShaderStage, TextureHandle,
    TextureParameter, TextureTarget, UniformLocation, VertexArrayHandle,
};
use crate::renderer::capabilities::Precision;
use crate::renderer::context::Generation;
use crate::resources::uniforms::UniformValue;

// ============================================================================
// Options
// ============================================================================

/// What the emulated device supports.
#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    pub generation: Generation,
    /// Float precisions reported as supported by both stages.
    pub precisions: Vec<Precision>,
    /// WebGL1 extensions that `getExtension` hands out.
    pub extensions: Vec<Extension>,
    pub limits: FxHashMap<Limit, i32>,
    /// Every link reports failure.
    pub fail_link: bool,
    pub drawing_buffer_size: (i32, i32),
}

impl HeadlessOptions {
    #[must_use]
    pub fn webgl1() -> Self {
        Self {
            generation: Generation::Gen1,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn webgl2() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_precisions(mut self, precisions: &[Precision]) -> Self {
        self.precisions = precisions.to_vec();
        self
    }

    #[must_use]
    pub fn with_extensions(mut self, extensions: &[Extension]) -> Self {
        self.extensions = extensions.to_vec();
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: Limit, value: i32) -> Self {
        self.limits.insert(limit, value);
        self
    }

    #[must_use]
    pub fn with_link_failure(mut self) -> Self {
        self.fail_link = true;
        self
    }

    #[must_use]
    pub fn with_drawing_buffer_size(mut self, width: i32, height: i32) -> Self {
        self.drawing_buffer_size = (width, height);
        self
    }
}

impl Default for HeadlessOptions {
    /// A WebGL2 device with every precision and extension and typical
    /// desktop limits.
    fn default() -> Self {
        let limits = [
            (Limit::MaxTextureImageUnits, 16),
            (Limit::MaxVertexTextureImageUnits, 16),
            (Limit::MaxTextureSize, 4096),
            (Limit::MaxCubeMapTextureSize, 4096),
            (Limit::MaxVertexAttribs, 16),
            (Limit::MaxVertexUniformVectors, 256),
            (Limit::MaxVaryingVectors, 15),
            (Limit::MaxFragmentUniformVectors, 224),
        ];
        Self {
            generation: Generation::Gen2,
            precisions: vec![Precision::Highp, Precision::Mediump, Precision::Lowp],
            extensions: vec![
                Extension::VertexArrayObject,
                Extension::InstancedArrays,
                Extension::TextureFloat,
            ],
            limits: limits.into_iter().collect(),
            fail_link: false,
            drawing_buffer_size: (1280, 720),
        }
    }
}

// ============================================================================
// Recorded calls
// ============================================================================

/// One recorded state-changing call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    BufferData {
        target: BufferTarget,
        len: usize,
        usage: BufferUsage,
    },
    BufferSubData {
        target: BufferTarget,
        offset: i32,
        len: usize,
    },
    BindBufferBase {
        index: u32,
        buffer: Option<BufferHandle>,
    },
    CompileShader {
        stage: ShaderStage,
        success: bool,
    },
    AttachShader(ProgramHandle, ShaderHandle),
    DetachShader(ProgramHandle, ShaderHandle),
    TransformFeedbackVaryings(Vec<String>),
    LinkProgram {
        program: ProgramHandle,
        success: bool,
    },
    UseProgram(Option<ProgramHandle>),
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    VertexAttribPointer {
        index: u32,
        size: i32,
    },
    VertexAttribDivisor {
        index: u32,
        divisor: u32,
    },
    Uniform {
        name: String,
        value: UniformValue,
    },
    UniformBlockBinding {
        block_index: u32,
        binding: u32,
    },
    Enable(Capability),
    Disable(Capability),
    CullFace(CullFace),
    BlendFunc(BlendFactor, BlendFactor),
    Viewport(i32, i32, i32, i32),
    Scissor(i32, i32, i32, i32),
    ResizeDrawingBuffer(i32, i32),
    ClearColor([f32; 4]),
    Clear(ClearMask),
    BindVertexArray(Option<VertexArrayHandle>),
    BindBuffer(BufferTarget, Option<BufferHandle>),
    DrawArrays {
        mode: DrawMode,
        count: i32,
        instances: Option<i32>,
    },
    DrawElements {
        mode: DrawMode,
        count: i32,
        instances: Option<i32>,
    },
    ActiveTexture(u32),
    BindTexture(TextureTarget, Option<TextureHandle>),
    TexImage2d {
        target: ImageTarget,
        width: i32,
        height: i32,
        format: PixelFormat,
    },
    TexImage3d {
        width: i32,
        height: i32,
        depth: i32,
    },
    GenerateMipmap(TextureTarget),
    BindFramebuffer(Option<FramebufferHandle>),
    RenderbufferStorage(i32, i32),
    DeleteBuffer(BufferHandle),
    DeleteShader(ShaderHandle),
    DeleteProgram(ProgramHandle),
    DeleteTexture(TextureHandle),
    DeleteVertexArray(VertexArrayHandle),
    DeleteFramebuffer(FramebufferHandle),
    DeleteRenderbuffer(RenderbufferHandle),
}

impl Call {
    #[must_use]
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::DrawArrays { .. } | Self::DrawElements { .. })
    }
}

// ============================================================================
// Emulated objects
// ============================================================================

#[derive(Debug)]
struct ShaderObject {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    info_log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    shaders: Vec<ShaderHandle>,
    vertex_source: String,
    fragment_source: String,
    linked: bool,
    info_log: String,
    attributes: Vec<String>,
    blocks: Vec<String>,
    uniforms: FxHashMap<String, UniformLocation>,
}

impl ProgramObject {
    fn declares(&self, name: &str) -> bool {
        self.vertex_source.contains(name) || self.fragment_source.contains(name)
    }
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    draw_calls: usize,
    enabled_extensions: FxHashSet<Extension>,
    enabled: FxHashSet<Capability>,

    buffers: SlotMap<BufferHandle, usize>,
    bound_buffers: FxHashMap<BufferTarget, BufferHandle>,
    shaders: SlotMap<ShaderHandle, ShaderObject>,
    last_sources: FxHashMap<ShaderStage, String>,
    programs: SlotMap<ProgramHandle, ProgramObject>,
    current_program: Option<ProgramHandle>,
    uniform_locations: SlotMap<UniformLocation, (ProgramHandle, String)>,
    uniform_values: FxHashMap<UniformLocation, UniformValue>,
    vertex_arrays: SlotMap<VertexArrayHandle, ()>,
    textures: SlotMap<TextureHandle, Option<TextureTarget>>,
    framebuffers: SlotMap<FramebufferHandle, ()>,
    renderbuffers: SlotMap<RenderbufferHandle, ()>,
    drawing_buffer_size: Option<(i32, i32)>,
}

// ============================================================================
// Backend
// ============================================================================

/// Recording backend, see the module docs.
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    options: Rc<HeadlessOptions>,
    state: Rc<RefCell<State>>,
}

impl HeadlessBackend {
    #[must_use]
    pub fn new(options: HeadlessOptions) -> Self {
        Self {
            options: Rc::new(options),
            state: Rc::default(),
        }
    }

    #[must_use]
    pub fn options(&self) -> &HeadlessOptions {
        &self.options
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }

    fn is_webgl2(&self) -> bool {
        self.options.generation.is_webgl2()
    }

    fn has_extension(&self, extension: Extension) -> bool {
        self.is_webgl2() || self.state.borrow().enabled_extensions.contains(&extension)
    }

    // --- Inspection -----------------------------------------------------------

    /// Every call recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    /// Forgets the recorded calls (object state and draw counter stay).
    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Number of draw calls issued, instanced or not.
    #[must_use]
    pub fn draw_calls(&self) -> usize {
        self.state.borrow().draw_calls
    }

    #[must_use]
    pub fn count_calls(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Last value uploaded to uniform `name` of any program.
    #[must_use]
    pub fn last_uniform(&self, name: &str) -> Option<UniformValue> {
        self.state.borrow().calls.iter().rev().find_map(|call| match call {
            Call::Uniform { name: n, value } if n == name => Some(value.clone()),
            _ => None,
        })
    }

    /// Current value of uniform `name` in `program`.
    #[must_use]
    pub fn uniform_value(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        let state = self.state.borrow();
        let location = state.programs.get(program)?.uniforms.get(name)?;
        state.uniform_values.get(location).cloned()
    }

    /// Source of the most recently compiled shader of `stage`.
    #[must_use]
    pub fn last_shader_source(&self, stage: ShaderStage) -> Option<String> {
        self.state.borrow().last_sources.get(&stage).cloned()
    }

    /// Size in bytes of a live buffer.
    #[must_use]
    pub fn buffer_size(&self, buffer: BufferHandle) -> Option<usize> {
        self.state.borrow().buffers.get(buffer).copied()
    }

    #[must_use]
    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.state.borrow().enabled.contains(&capability)
    }

    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    #[must_use]
    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }
}

fn first_error_line(source: &str) -> Option<usize> {
    source
        .lines()
        .position(|line| line.trim_start().starts_with("#error"))
}

fn precision_bits(precision: Precision) -> i32 {
    match precision {
        Precision::Highp => 23,
        Precision::Mediump => 10,
        Precision::Lowp => 8,
    }
}

impl GpuBackend for HeadlessBackend {
    fn generation(&self) -> Generation {
        self.options.generation
    }

    fn shader_precision(&self, _stage: ShaderStage, precision: Precision) -> i32 {
        if self.options.precisions.contains(&precision) {
            precision_bits(precision)
        } else {
            0
        }
    }

    fn limit(&self, limit: Limit) -> i32 {
        self.options.limits.get(&limit).copied().unwrap_or(0)
    }

    fn enable_extension(&self, extension: Extension) -> bool {
        let available = self.options.extensions.contains(&extension);
        if available {
            self.state.borrow_mut().enabled_extensions.insert(extension);
        }
        available
    }

    fn drawing_buffer_size(&self) -> (i32, i32) {
        self.state
            .borrow()
            .drawing_buffer_size
            .unwrap_or(self.options.drawing_buffer_size)
    }

    fn resize_drawing_buffer(&self, width: i32, height: i32) {
        let mut state = self.state.borrow_mut();
        state.drawing_buffer_size = Some((width, height));
        state.calls.push(Call::ResizeDrawingBuffer(width, height));
    }

    // --- Buffers --------------------------------------------------------------

    fn create_buffer(&self) -> Option<BufferHandle> {
        Some(self.state.borrow_mut().buffers.insert(0))
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferHandle>) {
        let mut state = self.state.borrow_mut();
        match buffer {
            Some(buffer) => state.bound_buffers.insert(target, buffer),
            None => state.bound_buffers.remove(&target),
        };
        state.calls.push(Call::BindBuffer(target, buffer));
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let mut state = self.state.borrow_mut();
        if let Some(&bound) = state.bound_buffers.get(&target)
            && let Some(size) = state.buffers.get_mut(bound)
        {
            *size = data.len();
        }
        state.calls.push(Call::BufferData {
            target,
            len: data.len(),
            usage,
        });
    }

    fn buffer_sub_data(&self, target: BufferTarget, offset: i32, data: &[u8]) {
        self.record(Call::BufferSubData {
            target,
            offset,
            len: data.len(),
        });
    }

    fn bind_buffer_base(&self, target: BufferTarget, index: u32, buffer: Option<BufferHandle>) {
        if !self.is_webgl2() || target != BufferTarget::Uniform {
            log::warn!("bindBufferBase is not available on WebGL1");
            return;
        }
        self.record(Call::BindBufferBase { index, buffer });
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        let mut state = self.state.borrow_mut();
        state.buffers.remove(buffer);
        state.calls.push(Call::DeleteBuffer(buffer));
    }

    // --- Shaders & programs ---------------------------------------------------

    fn create_shader(&self, stage: ShaderStage) -> Option<ShaderHandle> {
        Some(self.state.borrow_mut().shaders.insert(ShaderObject {
            stage,
            source: String::new(),
            compiled: false,
            info_log: String::new(),
        }))
    }

    fn shader_source(&self, shader: ShaderHandle, source: &str) {
        if let Some(object) = self.state.borrow_mut().shaders.get_mut(shader) {
            object.source = source.to_string();
        }
    }

    fn compile_shader(&self, shader: ShaderHandle) {
        let mut state = self.state.borrow_mut();
        let Some(object) = state.shaders.get_mut(shader) else {
            return;
        };
        match first_error_line(&object.source) {
            Some(line) => {
                object.compiled = false;
                object.info_log = format!("ERROR: 0:{}: '#error' : user error directive", line + 1);
            }
            None => {
                object.compiled = true;
                object.info_log.clear();
            }
        }
        let (stage, success, source) = (object.stage, object.compiled, object.source.clone());
        state.last_sources.insert(stage, source);
        state.calls.push(Call::CompileShader { stage, success });
    }

    fn shader_compile_status(&self, shader: ShaderHandle) -> bool {
        self.state
            .borrow()
            .shaders
            .get(shader)
            .is_some_and(|s| s.compiled)
    }

    fn shader_info_log(&self, shader: ShaderHandle) -> String {
        self.state
            .borrow()
            .shaders
            .get(shader)
            .map(|s| s.info_log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: ShaderHandle) {
        let mut state = self.state.borrow_mut();
        state.shaders.remove(shader);
        state.calls.push(Call::DeleteShader(shader));
    }

    fn create_program(&self) -> Option<ProgramHandle> {
        Some(self.state.borrow_mut().programs.insert(ProgramObject::default()))
    }

    fn attach_shader(&self, program: ProgramHandle, shader: ShaderHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state.programs.get_mut(program) {
            object.shaders.push(shader);
        }
        state.calls.push(Call::AttachShader(program, shader));
    }

    fn detach_shader(&self, program: ProgramHandle, shader: ShaderHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state.programs.get_mut(program) {
            object.shaders.retain(|&s| s != shader);
        }
        state.calls.push(Call::DetachShader(program, shader));
    }

    fn transform_feedback_varyings(&self, _program: ProgramHandle, varyings: &[String]) {
        if !self.is_webgl2() {
            log::warn!("transformFeedbackVaryings is not available on WebGL1");
            return;
        }
        self.record(Call::TransformFeedbackVaryings(varyings.to_vec()));
    }

    fn link_program(&self, program: ProgramHandle) {
        let fail_link = self.options.fail_link;
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let Some(object) = state.programs.get_mut(program) else {
            return;
        };

        let mut all_compiled = object.shaders.len() == 2;
        for shader in &object.shaders {
            match state.shaders.get(*shader) {
                Some(s) if s.compiled => match s.stage {
                    ShaderStage::Vertex => object.vertex_source.clone_from(&s.source),
                    ShaderStage::Fragment => object.fragment_source.clone_from(&s.source),
                },
                _ => all_compiled = false,
            }
        }

        object.linked = all_compiled && !fail_link;
        object.info_log = if object.linked {
            String::new()
        } else {
            "ERROR: link failed".to_string()
        };
        let success = object.linked;
        state.calls.push(Call::LinkProgram { program, success });
    }

    fn validate_program(&self, _program: ProgramHandle) {}

    fn program_link_status(&self, program: ProgramHandle) -> bool {
        self.state
            .borrow()
            .programs
            .get(program)
            .is_some_and(|p| p.linked)
    }

    fn program_info_log(&self, program: ProgramHandle) -> String {
        self.state
            .borrow()
            .programs
            .get(program)
            .map(|p| p.info_log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, program: Option<ProgramHandle>) {
        let mut state = self.state.borrow_mut();
        state.current_program = program;
        state.calls.push(Call::UseProgram(program));
    }

    fn delete_program(&self, program: ProgramHandle) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(program);
        state.uniform_locations.retain(|_, (owner, _)| *owner != program);
        state.calls.push(Call::DeleteProgram(program));
    }

    // --- Attributes & uniforms ------------------------------------------------

    fn attrib_location(&self, program: ProgramHandle, name: &str) -> i32 {
        let mut state = self.state.borrow_mut();
        let Some(object) = state.programs.get_mut(program).filter(|p| p.linked) else {
            return -1;
        };
        if let Some(index) = object.attributes.iter().position(|a| a == name) {
            return index as i32;
        }
        if !object.vertex_source.contains(name) {
            return -1;
        }
        object.attributes.push(name.to_string());
        object.attributes.len() as i32 - 1
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(Call::EnableVertexAttribArray(index));
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        self.record(Call::DisableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer(&self, index: u32, size: i32, _stride: i32, _offset: i32) {
        self.record(Call::VertexAttribPointer { index, size });
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        if !self.has_extension(Extension::InstancedArrays) {
            log::warn!("vertexAttribDivisor requires ANGLE_instanced_arrays");
            return;
        }
        self.record(Call::VertexAttribDivisor { index, divisor });
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let object = state.programs.get_mut(program).filter(|p| p.linked)?;
        if let Some(&location) = object.uniforms.get(name) {
            return Some(location);
        }

        let base = name.split(['[', '.']).next().unwrap_or(name);
        if !object.declares(base) {
            return None;
        }
        let location = state
            .uniform_locations
            .insert((program, name.to_string()));
        object.uniforms.insert(name.to_string(), location);
        Some(location)
    }

    fn upload_uniform(&self, location: UniformLocation, value: &UniformValue) {
        let mut state = self.state.borrow_mut();
        let Some((program, name)) = state.uniform_locations.get(location).cloned() else {
            return;
        };
        if state.current_program != Some(program) {
            log::warn!("Uniform {name} uploaded while its program is not in use");
        }
        state.uniform_values.insert(location, value.clone());
        state.calls.push(Call::Uniform {
            name,
            value: value.clone(),
        });
    }

    fn uniform_block_index(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        if !self.is_webgl2() {
            log::warn!("Uniform blocks are not available on WebGL1");
            return None;
        }
        let mut state = self.state.borrow_mut();
        let object = state.programs.get_mut(program).filter(|p| p.linked)?;
        if let Some(index) = object.blocks.iter().position(|b| b == name) {
            return Some(index as u32);
        }
        if !object.declares(&format!("uniform {name}")) {
            return None;
        }
        object.blocks.push(name.to_string());
        Some(object.blocks.len() as u32 - 1)
    }

    fn uniform_block_binding(&self, _program: ProgramHandle, block_index: u32, binding: u32) {
        self.record(Call::UniformBlockBinding {
            block_index,
            binding,
        });
    }

    // --- Fixed-function state -------------------------------------------------

    fn enable(&self, capability: Capability) {
        let mut state = self.state.borrow_mut();
        state.enabled.insert(capability);
        state.calls.push(Call::Enable(capability));
    }

    fn disable(&self, capability: Capability) {
        let mut state = self.state.borrow_mut();
        state.enabled.remove(&capability);
        state.calls.push(Call::Disable(capability));
    }

    fn cull_face(&self, face: CullFace) {
        self.record(Call::CullFace(face));
    }

    fn blend_func(&self, src: BlendFactor, dst: BlendFactor) {
        self.record(Call::BlendFunc(src, dst));
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(Call::Viewport(x, y, width, height));
    }

    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(Call::Scissor(x, y, width, height));
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record(Call::ClearColor([r, g, b, a]));
    }

    fn clear(&self, mask: ClearMask) {
        self.record(Call::Clear(mask));
    }

    // --- Vertex arrays --------------------------------------------------------

    fn create_vertex_array(&self) -> Option<VertexArrayHandle> {
        if !self.has_extension(Extension::VertexArrayObject) {
            return None;
        }
        Some(self.state.borrow_mut().vertex_arrays.insert(()))
    }

    fn bind_vertex_array(&self, vao: Option<VertexArrayHandle>) {
        if !self.has_extension(Extension::VertexArrayObject) {
            return;
        }
        self.record(Call::BindVertexArray(vao));
    }

    fn delete_vertex_array(&self, vao: VertexArrayHandle) {
        let mut state = self.state.borrow_mut();
        state.vertex_arrays.remove(vao);
        state.calls.push(Call::DeleteVertexArray(vao));
    }

    // --- Draw calls -----------------------------------------------------------

    fn draw_arrays(&self, mode: DrawMode, _first: i32, count: i32) {
        let mut state = self.state.borrow_mut();
        state.draw_calls += 1;
        state.calls.push(Call::DrawArrays {
            mode,
            count,
            instances: None,
        });
    }

    fn draw_elements(&self, mode: DrawMode, count: i32, _offset: i32) {
        let mut state = self.state.borrow_mut();
        state.draw_calls += 1;
        state.calls.push(Call::DrawElements {
            mode,
            count,
            instances: None,
        });
    }

    fn draw_arrays_instanced(&self, mode: DrawMode, _first: i32, count: i32, instances: i32) {
        if !self.has_extension(Extension::InstancedArrays) {
            log::warn!("Instanced drawing requires ANGLE_instanced_arrays");
            return;
        }
        let mut state = self.state.borrow_mut();
        state.draw_calls += 1;
        state.calls.push(Call::DrawArrays {
            mode,
            count,
            instances: Some(instances),
        });
    }

    fn draw_elements_instanced(&self, mode: DrawMode, count: i32, _offset: i32, instances: i32) {
        if !self.has_extension(Extension::InstancedArrays) {
            log::warn!("Instanced drawing requires ANGLE_instanced_arrays");
            return;
        }
        let mut state = self.state.borrow_mut();
        state.draw_calls += 1;
        state.calls.push(Call::DrawElements {
            mode,
            count,
            instances: Some(instances),
        });
    }

    // --- Textures -------------------------------------------------------------

    fn create_texture(&self) -> Option<TextureHandle> {
        Some(self.state.borrow_mut().textures.insert(None))
    }

    fn active_texture(&self, unit: u32) {
        self.record(Call::ActiveTexture(unit));
    }

    fn bind_texture(&self, target: TextureTarget, texture: Option<TextureHandle>) {
        let mut state = self.state.borrow_mut();
        if let Some(slot) = texture.and_then(|t| state.textures.get_mut(t)) {
            slot.get_or_insert(target);
        }
        state.calls.push(Call::BindTexture(target, texture));
    }

    fn tex_parameter(&self, target: TextureTarget, _parameter: TextureParameter) {
        if target == TextureTarget::Texture3d && !self.is_webgl2() {
            log::warn!("3D textures are not available on WebGL1");
        }
    }

    fn tex_image_2d(
        &self,
        target: ImageTarget,
        width: i32,
        height: i32,
        format: PixelFormat,
        _data: Option<&[u8]>,
    ) {
        self.record(Call::TexImage2d {
            target,
            width,
            height,
            format,
        });
    }

    fn tex_image_3d(
        &self,
        width: i32,
        height: i32,
        depth: i32,
        _format: PixelFormat,
        _data: Option<&[u8]>,
    ) {
        if !self.is_webgl2() {
            log::warn!("3D textures are not available on WebGL1");
            return;
        }
        self.record(Call::TexImage3d {
            width,
            height,
            depth,
        });
    }

    fn pixel_store_flip_y(&self, _flip: bool) {}

    fn generate_mipmap(&self, target: TextureTarget) {
        self.record(Call::GenerateMipmap(target));
    }

    fn delete_texture(&self, texture: TextureHandle) {
        let mut state = self.state.borrow_mut();
        state.textures.remove(texture);
        state.calls.push(Call::DeleteTexture(texture));
    }

    // --- Framebuffers ---------------------------------------------------------

    fn create_framebuffer(&self) -> Option<FramebufferHandle> {
        Some(self.state.borrow_mut().framebuffers.insert(()))
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>) {
        self.record(Call::BindFramebuffer(framebuffer));
    }

    fn framebuffer_color_texture(&self, _texture: Option<TextureHandle>) {}

    fn create_renderbuffer(&self) -> Option<RenderbufferHandle> {
        Some(self.state.borrow_mut().renderbuffers.insert(()))
    }

    fn bind_renderbuffer(&self, _renderbuffer: Option<RenderbufferHandle>) {}

    fn renderbuffer_depth_storage(&self, width: i32, height: i32) {
        self.record(Call::RenderbufferStorage(width, height));
    }

    fn framebuffer_depth_renderbuffer(&self, _renderbuffer: Option<RenderbufferHandle>) {}

    fn delete_framebuffer(&self, framebuffer: FramebufferHandle) {
        let mut state = self.state.borrow_mut();
        state.framebuffers.remove(framebuffer);
        state.calls.push(Call::DeleteFramebuffer(framebuffer));
    }

    fn delete_renderbuffer(&self, renderbuffer: RenderbufferHandle) {
        let mut state = self.state.borrow_mut();
        state.renderbuffers.remove(renderbuffer);
        state.calls.push(Call::DeleteRenderbuffer(renderbuffer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_directive_fails_compilation() {
        let backend = HeadlessBackend::new(HeadlessOptions::webgl2());
        let shader = backend.create_shader(ShaderStage::Fragment);
        let Some(shader) = shader else {
            panic!("headless shader creation never fails");
        };
        backend.shader_source(shader, "void main() {}\n  #error broken\n");
        backend.compile_shader(shader);
        assert!(!backend.shader_compile_status(shader));
        assert!(backend.shader_info_log(shader).contains("0:2"));
    }

    #[test]
    fn webgl1_extensions_follow_options() {
        let backend =
            HeadlessBackend::new(HeadlessOptions::webgl1().with_extensions(&[Extension::InstancedArrays]));
        assert!(backend.enable_extension(Extension::InstancedArrays));
        assert!(!backend.enable_extension(Extension::VertexArrayObject));
        assert!(backend.create_vertex_array().is_none());
    }
}
