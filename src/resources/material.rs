//! Material
//!
//! A material couples one [`Program`] with its uniform map and draw state.
//!
//! Construction only renders the templates. The program is compiled and
//! linked by [`Material::create`] against the first geometry the material is
//! used with, because the geometry decides which optional attributes (and
//! therefore which shader defines) exist. Meshes sharing a material share
//! the linked program: the first mesh wins.
//!
//! # Uniform map
//!
//! After `create` the map holds, in this order:
//!
//! 1. `uDiffuse`, `uModelMatrix`, `uModelViewMatrix`, `uNormalMatrix`
//! 2. caller uniforms (may override `uDiffuse`)
//! 3. generation 1 only: one uniform per light field
//!    (`uPointLights[0].position`, ...)
//! 4. `uCameraPosition`, injected when point lights are attached
//! 5. generation 1 only: `uProjectionMatrix`
//!
//! Sampler uniforms get texture units `0, 1, 2, ...` in map order.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat3, Mat4, Vec3};

use crate::errors::{MediumError, Result};
use crate::renderer::backend::{BlendFactor, CullFace, DrawMode, ShaderStage};
use crate::renderer::context::GpuContext;
use crate::renderer::uniform_buffer::PROJECTION_VIEW_BINDING;
use crate::resources::geometry::Geometry;
use crate::resources::uniforms::{UniformMap, UniformType, UniformValue};
use crate::scene::light::{Light, LightKind};
use crate::scene::lights::LightsHandle;
use crate::shader::{Program, ShaderContext, ShaderFeatures, ShaderHooks, process_source, templates};

/// Material shared between meshes.
pub type SharedMaterial = Rc<RefCell<Material>>;

// ============================================================================
// Options
// ============================================================================

/// Built-in shading models. Selects the template pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaterialKind {
    /// Unlit, flat `uDiffuse` or vertex colors.
    #[default]
    Basic,
    /// Diffuse directional lighting.
    Lambert,
    /// Directional plus point lights with specular highlights.
    Phong,
    /// Unlit lines for grid and axis helpers.
    Helper,
}

impl MaterialKind {
    /// `(vertex, fragment)` template names.
    #[must_use]
    pub fn templates(self) -> (&'static str, &'static str) {
        match self {
            Self::Basic => ("vertex", "basic"),
            Self::Lambert => ("vertex", "lambert"),
            Self::Phong => ("vertex", "phong"),
            Self::Helper => ("helper_vertex", "helper_fragment"),
        }
    }
}

/// Face culling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Culling {
    #[default]
    None,
    Front,
    Back,
    FrontAndBack,
}

impl Culling {
    /// Face passed to `cullFace`, `None` when culling is off.
    #[must_use]
    pub fn face(self) -> Option<CullFace> {
        match self {
            Self::None => None,
            Self::Front => Some(CullFace::Front),
            Self::Back => Some(CullFace::Back),
            Self::FrontAndBack => Some(CullFace::FrontAndBack),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaterialOptions {
    pub name: String,
    /// Default: [`MaterialKind::Basic`].
    pub kind: MaterialKind,
    /// Replaces the vertex template. Written in GLSL ES 3.00; hook markers
    /// are substituted and the source is transpiled on generation 1.
    pub vertex_shader: Option<String>,
    /// Replaces the fragment template.
    pub fragment_shader: Option<String>,
    /// Caller uniforms, in declaration order.
    pub uniforms: Vec<(String, UniformValue)>,
    pub hooks: ShaderHooks,
    /// Default: [`DrawMode::Triangles`].
    pub draw_mode: DrawMode,
    /// Default: [`Culling::None`].
    pub culling: Culling,
    /// Only honoured by instanced draws. Default: `false`.
    pub blending: bool,
    /// Default: `(SrcAlpha, One)`.
    pub blend_function: (BlendFactor, BlendFactor),
    pub ambient_light: Option<LightsHandle>,
    pub directional_lights: Option<LightsHandle>,
    pub point_lights: Option<LightsHandle>,
    /// Captured vertex outputs, generation 2 only.
    pub transform_feedback_varyings: Option<Vec<String>>,
}

impl Default for MaterialOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: MaterialKind::Basic,
            vertex_shader: None,
            fragment_shader: None,
            uniforms: Vec::new(),
            hooks: ShaderHooks::default(),
            draw_mode: DrawMode::Triangles,
            culling: Culling::None,
            blending: false,
            blend_function: (BlendFactor::SrcAlpha, BlendFactor::One),
            ambient_light: None,
            directional_lights: None,
            point_lights: None,
            transform_feedback_varyings: None,
        }
    }
}

impl MaterialOptions {
    #[must_use]
    pub fn new(kind: MaterialKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_uniform(mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        self.uniforms.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: ShaderHooks) -> Self {
        self.hooks = hooks;
        self
    }

    #[must_use]
    pub fn with_ambient_light(mut self, lights: LightsHandle) -> Self {
        self.ambient_light = Some(lights);
        self
    }

    #[must_use]
    pub fn with_directional_lights(mut self, lights: LightsHandle) -> Self {
        self.directional_lights = Some(lights);
        self
    }

    #[must_use]
    pub fn with_point_lights(mut self, lights: LightsHandle) -> Self {
        self.point_lights = Some(lights);
        self
    }
}

// ============================================================================
// Material
// ============================================================================

#[derive(Debug)]
pub struct Material {
    name: String,
    kind: MaterialKind,
    hooks: ShaderHooks,
    draw_mode: DrawMode,
    culling: Culling,
    blending: bool,
    blend_function: (BlendFactor, BlendFactor),
    ambient_light: Option<LightsHandle>,
    directional_lights: Option<LightsHandle>,
    point_lights: Option<LightsHandle>,
    transform_feedback_varyings: Option<Vec<String>>,
    custom_uniforms: Vec<(String, UniformValue)>,

    vertex_shader: String,
    fragment_shader: String,
    uniforms: UniformMap,
    program: Program,
    create_attempted: bool,
}

impl Material {
    /// Renders the templates for the context generation. Nothing is compiled
    /// until [`create`](Self::create).
    pub fn new(ctx: &GpuContext, options: MaterialOptions) -> Result<Self> {
        let (vertex_template, fragment_template) = options.kind.templates();
        let vertex_shader = match options.vertex_shader {
            Some(source) => source,
            None => templates::render(vertex_template, ctx.generation())?,
        };
        let fragment_shader = match options.fragment_shader {
            Some(source) => source,
            None => templates::render(fragment_template, ctx.generation())?,
        };

        Ok(Self {
            name: options.name,
            kind: options.kind,
            hooks: options.hooks,
            draw_mode: options.draw_mode,
            culling: options.culling,
            blending: options.blending,
            blend_function: options.blend_function,
            ambient_light: options.ambient_light,
            directional_lights: options.directional_lights,
            point_lights: options.point_lights,
            transform_feedback_varyings: options.transform_feedback_varyings,
            custom_uniforms: options.uniforms,
            vertex_shader,
            fragment_shader,
            uniforms: UniformMap::new(),
            program: Program::new(ctx),
            create_attempted: false,
        })
    }

    /// Same as [`new`](Self::new), wrapped for sharing between meshes.
    pub fn shared(ctx: &GpuContext, options: MaterialOptions) -> Result<SharedMaterial> {
        Ok(Rc::new(RefCell::new(Self::new(ctx, options)?)))
    }

    /// Finalizes the shader sources for `geometry`, links the program and
    /// builds the uniform map. Runs once; later calls return `Ok(())`.
    ///
    /// A compile or link failure is not an error: it is logged and leaves
    /// [`is_created`](Self::is_created) false. Declaring more samplers than
    /// the context has texture units is.
    pub fn create(&mut self, ctx: &GpuContext, geometry: &Geometry) -> Result<()> {
        if self.create_attempted {
            return Ok(());
        }

        let samplers = self
            .custom_uniforms
            .iter()
            .filter(|(_, value)| value.kind().is_sampler())
            .count();
        let max = ctx.capabilities().max_textures;
        if samplers > max {
            return Err(MediumError::TextureUnitsExceeded {
                requested: samplers,
                max,
            });
        }
        self.create_attempted = true;

        // Shader sources
        let shader_ctx = ShaderContext {
            generation: ctx.generation(),
            precision: ctx.capabilities().precision,
            features: geometry.features() | self.light_features(),
            hooks: &self.hooks,
            directional_lights: self.directional_lights.as_ref().map(|l| l.borrow().len()),
            point_lights: self.point_lights.as_ref().map(|l| l.borrow().len()),
        };
        self.vertex_shader = process_source(&self.vertex_shader, ShaderStage::Vertex, &shader_ctx);
        self.fragment_shader =
            process_source(&self.fragment_shader, ShaderStage::Fragment, &shader_ctx);

        self.program.link(
            ctx,
            &self.vertex_shader,
            &self.fragment_shader,
            self.transform_feedback_varyings.as_deref(),
        );

        if ctx.is_webgl2() {
            self.program.set_uniform_block_location(
                ctx,
                "ProjectionView",
                ctx.projection_view_buffer(),
                PROJECTION_VIEW_BINDING,
            );
        }

        // Uniform map
        let mut uniforms = UniformMap::new();
        uniforms.insert("uDiffuse", UniformValue::Vec3(Vec3::ONE));
        uniforms.insert("uModelMatrix", UniformValue::Mat4(Mat4::IDENTITY));
        uniforms.insert("uModelViewMatrix", UniformValue::Mat4(Mat4::IDENTITY));
        uniforms.insert("uNormalMatrix", UniformValue::Mat3(Mat3::IDENTITY));
        uniforms.extend(self.custom_uniforms.iter().cloned());

        let aggregates: Vec<LightsHandle> = self.light_aggregates().cloned().collect();
        for lights in &aggregates {
            let lights = lights.borrow();
            let kind = lights.kind();
            if ctx.is_webgl2() {
                self.program.set_uniform_block_location(
                    ctx,
                    kind.block_name(),
                    lights.buffer(),
                    kind.binding(),
                );
            } else {
                let values: Vec<_> = lights.lights().iter().map(Light::uniform_values).collect();
                uniforms.extend(light_uniforms(kind, &values));
            }
        }

        if self.point_lights.is_some() && !uniforms.contains("uCameraPosition") {
            uniforms.insert("uCameraPosition", UniformValue::Vec3(Vec3::ZERO));
        }

        if !ctx.is_webgl2() {
            uniforms.insert("uProjectionMatrix", UniformValue::Mat4(Mat4::IDENTITY));
        }

        let mut unit = 0;
        for (_, uniform) in uniforms.iter_mut() {
            if uniform.kind().is_sampler() {
                uniform.texture_unit = Some(unit);
                unit += 1;
            }
        }

        let names: Vec<String> = uniforms.names().map(str::to_string).collect();
        for name in &names {
            self.program.set_uniform_location(ctx, &mut uniforms, name);
        }
        self.uniforms = uniforms;

        Ok(())
    }

    /// Writes every uniform of the map for one draw call.
    ///
    /// Skipped entirely when the program never linked.
    pub fn set_uniforms(
        &mut self,
        ctx: &GpuContext,
        projection_matrix: Mat4,
        model_view_matrix: Mat4,
        model_matrix: Mat4,
        camera_position: Option<Vec3>,
    ) {
        if !self.program.is_created() {
            return;
        }

        let normal_matrix = Mat3::from_mat4(model_matrix.inverse()).transpose();
        self.uniforms.set_value("uModelMatrix", UniformValue::Mat4(model_matrix));
        self.uniforms.set_value("uModelViewMatrix", UniformValue::Mat4(model_view_matrix));
        self.uniforms.set_value("uNormalMatrix", UniformValue::Mat3(normal_matrix));
        if let Some(position) = camera_position {
            self.uniforms.set_value("uCameraPosition", UniformValue::Vec3(position));
        }

        if !ctx.is_webgl2() {
            self.uniforms
                .set_value("uProjectionMatrix", UniformValue::Mat4(projection_matrix));
            self.refresh_light_uniforms();
        }

        let gl = ctx.gl();
        for (_, uniform) in self.uniforms.iter() {
            let kind = uniform.kind();
            if kind.is_sampler() {
                if kind == UniformType::Texture3d && !ctx.is_webgl2() {
                    continue;
                }
                let Some(unit) = uniform.texture_unit else {
                    continue;
                };
                if let Some(location) = uniform.location {
                    gl.upload_uniform(location, &UniformValue::Int(unit as i32));
                }
                gl.active_texture(unit);
                if let Some(target) = kind.texture_target() {
                    gl.bind_texture(target, uniform.value.texture());
                }
            } else if let Some(location) = uniform.location {
                gl.upload_uniform(location, &uniform.value);
            }
        }
    }

    /// Copies the live light fields into the discrete generation-1 uniforms.
    fn refresh_light_uniforms(&mut self) {
        let aggregates: Vec<LightsHandle> = self.light_aggregates().cloned().collect();
        for lights in aggregates {
            let lights = lights.borrow();
            let values: Vec<_> = lights.lights().iter().map(Light::uniform_values).collect();
            for (name, value) in light_uniforms(lights.kind(), &values) {
                self.uniforms.set_value(&name, value);
            }
        }
    }

    fn light_aggregates(&self) -> impl Iterator<Item = &LightsHandle> {
        [&self.ambient_light, &self.directional_lights, &self.point_lights]
            .into_iter()
            .flatten()
    }

    fn light_features(&self) -> ShaderFeatures {
        let mut features = ShaderFeatures::empty();
        features.set(ShaderFeatures::AMBIENT_LIGHT, self.ambient_light.is_some());
        features.set(ShaderFeatures::DIRECTIONAL_LIGHTS, self.directional_lights.is_some());
        features.set(ShaderFeatures::POINT_LIGHTS, self.point_lights.is_some());
        features
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> MaterialKind {
        self.kind
    }

    /// `true` once the program linked.
    #[inline]
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.program.is_created()
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    #[must_use]
    pub fn uniforms(&self) -> &UniformMap {
        &self.uniforms
    }

    /// Updates a uniform value for the next draw. Returns `false` when the
    /// material has no such uniform (or was not created yet) or `value` does
    /// not match the declared type.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) -> bool {
        self.uniforms.set_value(name, value.into())
    }

    /// Final vertex source, after [`create`](Self::create).
    #[must_use]
    pub fn vertex_shader(&self) -> &str {
        &self.vertex_shader
    }

    #[must_use]
    pub fn fragment_shader(&self) -> &str {
        &self.fragment_shader
    }

    #[inline]
    #[must_use]
    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    pub fn set_draw_mode(&mut self, draw_mode: DrawMode) {
        self.draw_mode = draw_mode;
    }

    #[inline]
    #[must_use]
    pub fn culling(&self) -> Culling {
        self.culling
    }

    pub fn set_culling(&mut self, culling: Culling) {
        self.culling = culling;
    }

    #[inline]
    #[must_use]
    pub fn blending(&self) -> bool {
        self.blending
    }

    #[inline]
    #[must_use]
    pub fn blend_function(&self) -> (BlendFactor, BlendFactor) {
        self.blend_function
    }

    pub fn set_blending(&mut self, blending: bool, blend_function: (BlendFactor, BlendFactor)) {
        self.blending = blending;
        self.blend_function = blend_function;
    }

    /// Releases the program. Light aggregates and textures belong to their
    /// owners and are left alone.
    pub fn dispose(&mut self, ctx: &GpuContext) {
        self.program.dispose(ctx);
        self.uniforms = UniformMap::new();
    }
}

/// Discrete generation-1 uniforms of one light aggregate.
///
/// The ambient light is a single struct (`uAmbientLight.color`), the other
/// kinds are struct arrays (`uPointLights[1].shininess`).
fn light_uniforms(kind: LightKind, values: &[Vec<UniformValue>]) -> Vec<(String, UniformValue)> {
    let mut uniforms = Vec::new();
    for (i, light) in values.iter().enumerate() {
        for (field, value) in kind.field_names().iter().zip(light) {
            let name = match kind {
                LightKind::Ambient => format!("{}.{field}", kind.uniform_name()),
                LightKind::Directional | LightKind::Point => {
                    format!("{}[{i}].{field}", kind.uniform_name())
                }
            };
            uniforms.push((name, value.clone()));
        }
    }
    uniforms
}
