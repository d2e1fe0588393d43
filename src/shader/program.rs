//! Shader Program
//!
//! Wraps one GPU program object through its life cycle:
//! compile both stages → attach → (transform feedback varyings) → link →
//! validate.
//!
//! Failures never propagate as errors. A stage that fails to compile or a
//! program that fails to link is logged and leaves [`Program::is_created`]
//! false; every later operation on such a program is a no-op, and meshes
//! skip drawing it.

use rustc_hash::FxHashMap;

use crate::renderer::backend::{
    BufferHandle, BufferTarget, ProgramHandle, ShaderHandle, ShaderStage,
};
use crate::renderer::context::GpuContext;
use crate::resources::uniforms::UniformMap;
use crate::utils::add_line_numbers;

#[derive(Debug)]
pub struct Program {
    program: Option<ProgramHandle>,
    vertex_shader: Option<ShaderHandle>,
    fragment_shader: Option<ShaderHandle>,
    created: bool,
    attribute_locations: FxHashMap<String, u32>,
    uniform_blocks: FxHashMap<String, u32>,
}

impl Program {
    /// Allocates the program object. Nothing is compiled yet.
    pub fn new(ctx: &GpuContext) -> Self {
        let program = ctx.gl().create_program();
        if program.is_none() {
            log::error!("Failed to create program object");
        }
        Self {
            program,
            vertex_shader: None,
            fragment_shader: None,
            created: false,
            attribute_locations: FxHashMap::default(),
            uniform_blocks: FxHashMap::default(),
        }
    }

    /// `true` once both stages compiled and the program linked.
    #[inline]
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.created
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> Option<ProgramHandle> {
        self.program
    }

    /// Cached attribute slot, set by [`set_attribute_location`](Self::set_attribute_location).
    #[must_use]
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attribute_locations.get(name).copied()
    }

    #[must_use]
    pub fn uniform_block_index(&self, name: &str) -> Option<u32> {
        self.uniform_blocks.get(name).copied()
    }

    /// Compiles one stage. On failure the stage name, the driver log and a
    /// line-numbered dump of `source` are logged, the shader object is
    /// deleted and `None` is returned.
    pub fn compile(ctx: &GpuContext, stage: ShaderStage, source: &str) -> Option<ShaderHandle> {
        let gl = ctx.gl();
        let Some(shader) = gl.create_shader(stage) else {
            log::error!("Failed to create {stage} shader object");
            return None;
        };

        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if !gl.shader_compile_status(shader) {
            log::error!("Failed to compile {stage} shader:");
            log::error!("{}", gl.shader_info_log(shader));
            log::error!("{}", add_line_numbers(source));
            gl.delete_shader(shader);
            return None;
        }

        Some(shader)
    }

    /// Compiles both stages and links them.
    ///
    /// `transform_feedback_varyings` is honoured on generation 2 only.
    pub fn link(
        &mut self,
        ctx: &GpuContext,
        vertex_source: &str,
        fragment_source: &str,
        transform_feedback_varyings: Option<&[String]>,
    ) {
        let Some(program) = self.program else {
            return;
        };

        self.vertex_shader = Self::compile(ctx, ShaderStage::Vertex, vertex_source);
        self.fragment_shader = Self::compile(ctx, ShaderStage::Fragment, fragment_source);

        // A broken stage is never attached; the program stays unusable.
        let (Some(vertex_shader), Some(fragment_shader)) =
            (self.vertex_shader, self.fragment_shader)
        else {
            return;
        };

        let gl = ctx.gl();
        gl.attach_shader(program, vertex_shader);
        gl.attach_shader(program, fragment_shader);

        if let Some(varyings) = transform_feedback_varyings {
            if ctx.is_webgl2() {
                gl.transform_feedback_varyings(program, varyings);
            } else {
                log::warn!("Transform feedback is not supported on WebGL1, ignoring varyings");
            }
        }

        gl.link_program(program);
        gl.validate_program(program);

        if gl.program_link_status(program) {
            log::debug!("Linked program {program:?}");
            self.created = true;
        } else {
            log::error!("Failed to link program: {}", gl.program_info_log(program));
        }
    }

    /// Resolves, caches and enables the vertex slot of attribute `name`.
    ///
    /// Inactive attributes (location `-1`) are not cached.
    pub fn set_attribute_location(&mut self, ctx: &GpuContext, name: &str) {
        let Some(program) = self.linked() else {
            return;
        };
        let gl = ctx.gl();
        match u32::try_from(gl.attrib_location(program, name)) {
            Ok(location) => {
                self.attribute_locations.insert(name.to_string(), location);
                gl.enable_vertex_attrib_array(location);
            }
            Err(_) => log::debug!("Attribute {name} is not active in program {program:?}"),
        }
    }

    /// Resolves the location of uniform `name` and stores it in `uniforms`.
    pub fn set_uniform_location(&self, ctx: &GpuContext, uniforms: &mut UniformMap, name: &str) {
        let Some(program) = self.linked() else {
            return;
        };
        if let Some(uniform) = uniforms.get_mut(name) {
            uniform.location = ctx.gl().uniform_location(program, name);
        }
    }

    /// Binds uniform block `name` to `binding` and attaches `buffer` to that
    /// binding point. Generation 2 only.
    pub fn set_uniform_block_location(
        &mut self,
        ctx: &GpuContext,
        name: &str,
        buffer: Option<BufferHandle>,
        binding: u32,
    ) {
        if !ctx.is_webgl2() {
            return;
        }
        let Some(program) = self.linked() else {
            return;
        };
        let gl = ctx.gl();
        let Some(block_index) = gl.uniform_block_index(program, name) else {
            log::debug!("Uniform block {name} is not active in program {program:?}");
            return;
        };
        self.uniform_blocks.insert(name.to_string(), block_index);
        gl.uniform_block_binding(program, block_index, binding);
        gl.bind_buffer_base(BufferTarget::Uniform, binding, buffer);
    }

    pub fn bind(&self, ctx: &GpuContext) {
        ctx.gl().use_program(self.program);
    }

    /// Releases the program. Only touches state that was actually set up.
    pub fn dispose(&mut self, ctx: &GpuContext) {
        let gl = ctx.gl();
        for (_, location) in self.attribute_locations.drain() {
            gl.disable_vertex_attrib_array(location);
        }

        if let Some(program) = self.program.take() {
            let attached = self.vertex_shader.is_some() && self.fragment_shader.is_some();
            for shader in [self.vertex_shader.take(), self.fragment_shader.take()]
                .into_iter()
                .flatten()
            {
                if attached {
                    gl.detach_shader(program, shader);
                }
                gl.delete_shader(shader);
            }
            gl.delete_program(program);
        }

        self.uniform_blocks.clear();
        self.created = false;
    }

    fn linked(&self) -> Option<ProgramHandle> {
        self.program.filter(|_| self.created)
    }
}
