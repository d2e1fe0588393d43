//! Material & Program Tests
//!
//! Tests for:
//! - Program compile / link failure handling
//! - Uniform map construction order and texture unit assignment
//! - Texture unit limits
//! - Light aggregates (uniform blocks on generation 2, discrete uniforms on generation 1)

use glam::{Mat4, Vec3};

use medium::renderer::backend::headless::{Call, HeadlessBackend, HeadlessOptions};
use medium::renderer::backend::{Limit, ShaderStage};
use medium::renderer::{GpuContext, Precision};
use medium::resources::uniforms::UniformValue;
use medium::scene::{Camera, Light, Lights, Mesh};
use medium::shader::ShaderHooks;
use medium::{Geometry, GeometryData, Material, MaterialKind, MaterialOptions, MediumError};

fn context(options: HeadlessOptions) -> (GpuContext, HeadlessBackend) {
    let backend = HeadlessBackend::new(options);
    let ctx = GpuContext::new(Box::new(backend.clone()), Precision::Highp);
    (ctx, backend)
}

fn triangle(ctx: &GpuContext) -> Geometry {
    let data = GeometryData::new(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
        .with_indices(vec![0, 1, 2])
        .with_normals(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0])
        .with_uvs(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    Geometry::new(ctx, data).expect("geometry")
}

fn sampler_hooks(names: &[&str]) -> ShaderHooks {
    let declarations: String = names
        .iter()
        .map(|name| format!("uniform sampler2D {name};\n"))
        .collect();
    ShaderHooks::new().with_fragment_pre(declarations)
}

// ============================================================================
// Program status
// ============================================================================

#[test]
fn compile_failure_leaves_material_uncreated() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let geometry = triangle(&ctx);
    let options = MaterialOptions::default()
        .with_hooks(ShaderHooks::new().with_fragment_main("#error broken on purpose"));
    let material = Material::shared(&ctx, options).expect("material");

    let mut mesh = Mesh::new(&ctx, geometry, material.clone()).expect("mesh is still built");
    assert!(!material.borrow().is_created());
    assert!(backend.calls().contains(&Call::CompileShader {
        stage: ShaderStage::Fragment,
        success: false,
    }));

    let camera = Camera::default();
    mesh.draw(&ctx, &camera);
    assert_eq!(backend.draw_calls(), 0);
}

#[test]
fn link_failure_leaves_material_uncreated() {
    let (ctx, backend) = context(HeadlessOptions::webgl1().with_link_failure());
    let geometry = triangle(&ctx);
    let mut material = Material::new(&ctx, MaterialOptions::default()).expect("material");

    material.create(&ctx, &geometry).expect("link failure is not an error");
    assert!(!material.is_created());
    assert_eq!(
        backend.count_calls(|c| matches!(c, Call::LinkProgram { success: false, .. })),
        1
    );

    material.set_uniforms(&ctx, Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY, None);
    assert_eq!(backend.count_calls(|c| matches!(c, Call::Uniform { .. })), 0);
}

#[test]
fn successful_link_marks_created() {
    let (ctx, _) = context(HeadlessOptions::webgl2());
    let geometry = triangle(&ctx);
    let mut material = Material::new(&ctx, MaterialOptions::default()).expect("material");
    material.create(&ctx, &geometry).expect("create");

    assert!(material.is_created());
    assert!(material.program().uniform_block_index("ProjectionView").is_some());
}

#[test]
fn create_runs_once() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let geometry = triangle(&ctx);
    let mut material = Material::new(&ctx, MaterialOptions::default()).expect("material");

    material.create(&ctx, &geometry).expect("create");
    material.create(&ctx, &geometry).expect("create again");
    assert_eq!(backend.count_calls(|c| matches!(c, Call::LinkProgram { .. })), 1);
}

// ============================================================================
// Uniform map
// ============================================================================

#[test]
fn uniform_map_order_generation_one() {
    let (ctx, _) = context(HeadlessOptions::webgl1());
    let geometry = triangle(&ctx);
    let options = MaterialOptions::default().with_uniform("uTime", 0.0_f32);
    let mut material = Material::new(&ctx, options).expect("material");
    material.create(&ctx, &geometry).expect("create");

    let names: Vec<_> = material.uniforms().names().collect();
    assert_eq!(
        names,
        [
            "uDiffuse",
            "uModelMatrix",
            "uModelViewMatrix",
            "uNormalMatrix",
            "uTime",
            "uProjectionMatrix",
        ]
    );
}

#[test]
fn caller_can_override_diffuse() {
    let (ctx, _) = context(HeadlessOptions::webgl2());
    let geometry = triangle(&ctx);
    let red = Vec3::new(1.0, 0.0, 0.0);
    let options = MaterialOptions::default().with_uniform("uDiffuse", red);
    let mut material = Material::new(&ctx, options).expect("material");
    material.create(&ctx, &geometry).expect("create");

    let diffuse = material.uniforms().get("uDiffuse").expect("uDiffuse");
    assert_eq!(diffuse.value, UniformValue::Vec3(red));
    assert_eq!(material.uniforms().names().filter(|n| *n == "uDiffuse").count(), 1);
}

#[test]
fn samplers_get_consecutive_units() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let geometry = triangle(&ctx);
    let a = ctx.gl().create_texture().expect("texture");
    let b = ctx.gl().create_texture().expect("texture");
    let options = MaterialOptions::default()
        .with_hooks(sampler_hooks(&["uMap", "uDetail"]))
        .with_uniform("uMap", UniformValue::Texture(a))
        .with_uniform("uStrength", 0.5_f32)
        .with_uniform("uDetail", UniformValue::Texture(b));
    let mut material = Material::new(&ctx, options).expect("material");
    material.create(&ctx, &geometry).expect("create");

    let uniforms = material.uniforms();
    assert_eq!(uniforms.get("uMap").and_then(|u| u.texture_unit), Some(0));
    assert_eq!(uniforms.get("uDetail").and_then(|u| u.texture_unit), Some(1));
    assert_eq!(uniforms.get("uStrength").and_then(|u| u.texture_unit), None);

    material.program().bind(&ctx);
    material.set_uniforms(&ctx, Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY, None);
    let calls = backend.calls();
    assert!(calls.contains(&Call::ActiveTexture(0)));
    assert!(calls.contains(&Call::ActiveTexture(1)));
    assert_eq!(backend.last_uniform("uDetail"), Some(UniformValue::Int(1)));
}

#[test]
fn uniform_type_is_fixed_after_create() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let geometry = triangle(&ctx);
    let a = ctx.gl().create_texture().expect("texture");
    let c = ctx.gl().create_texture().expect("texture");
    let hooks = ShaderHooks::new()
        .with_fragment_pre("uniform sampler2D uMap;\nuniform float uStrength;\n");
    let options = MaterialOptions::default()
        .with_hooks(hooks)
        .with_uniform("uMap", UniformValue::Texture(a))
        .with_uniform("uStrength", 0.5_f32);
    let mut material = Material::new(&ctx, options).expect("material");
    material.create(&ctx, &geometry).expect("create");

    assert!(!material.set_uniform("uStrength", UniformValue::Texture(c)));
    assert!(material.set_uniform("uStrength", 0.25_f32));
    assert_eq!(
        material.uniforms().get("uStrength").map(|u| &u.value),
        Some(&UniformValue::Float(0.25))
    );

    backend.clear_calls();
    material.program().bind(&ctx);
    material.set_uniforms(&ctx, Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY, None);
    let units = backend.count_calls(|call| matches!(call, Call::ActiveTexture(_)));
    assert_eq!(units, 1);
    assert_eq!(backend.last_uniform("uStrength"), Some(UniformValue::Float(0.25)));
    assert_eq!(backend.last_uniform("uMap"), Some(UniformValue::Int(0)));
}

#[test]
fn too_many_samplers_is_an_error() {
    let (ctx, _) = context(HeadlessOptions::webgl2().with_limit(Limit::MaxTextureImageUnits, 2));
    let geometry = triangle(&ctx);
    let mut options = MaterialOptions::default();
    for i in 0..3 {
        let texture = ctx.gl().create_texture().expect("texture");
        options = options.with_uniform(format!("uMap{i}"), UniformValue::Texture(texture));
    }
    let mut material = Material::new(&ctx, options).expect("material");

    let err = material.create(&ctx, &geometry).unwrap_err();
    assert!(matches!(
        err,
        MediumError::TextureUnitsExceeded { requested: 3, max: 2 }
    ));
    assert!(!material.is_created());
}

#[test]
fn uniforms_missing_from_the_program_have_no_location() {
    let (ctx, _) = context(HeadlessOptions::webgl2());
    let geometry = triangle(&ctx);
    let options = MaterialOptions::default().with_uniform("uNeverDeclared", 1.0_f32);
    let mut material = Material::new(&ctx, options).expect("material");
    material.create(&ctx, &geometry).expect("create");

    let uniform = material.uniforms().get("uNeverDeclared").expect("kept in the map");
    assert!(uniform.location.is_none());
    assert!(material.uniforms().get("uModelMatrix").and_then(|u| u.location).is_some());
}

// ============================================================================
// Lights
// ============================================================================

fn point_lights() -> Vec<Light> {
    vec![
        Light::point().with_position(Vec3::new(1.0, 2.0, 3.0)),
        Light::point().with_position(Vec3::new(-1.0, 0.0, 0.0)).with_intensity(0.5),
    ]
}

#[test]
fn point_lights_use_a_uniform_block_on_generation_two() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let geometry = triangle(&ctx);
    let lights = Lights::shared(&ctx, point_lights()).expect("lights");

    let buffer = lights.borrow().buffer().expect("uniform buffer");
    assert_eq!(backend.buffer_size(buffer), Some(2 * 20 * 4));
    assert_eq!(lights.borrow().buffer_data().len(), 40);
    assert_eq!(&lights.borrow().buffer_data()[20..23], &[-1.0, 0.0, 0.0]);

    let options = MaterialOptions::new(MaterialKind::Phong).with_point_lights(lights.clone());
    let mut material = Material::new(&ctx, options).expect("material");
    material.create(&ctx, &geometry).expect("create");

    assert!(material.program().uniform_block_index("PointLights").is_some());
    assert!(backend.calls().contains(&Call::BindBufferBase {
        index: 3,
        buffer: Some(buffer),
    }));
    assert!(material.uniforms().names().all(|n| !n.starts_with("uPointLights")));
    assert!(material.uniforms().contains("uCameraPosition"));
}

#[test]
fn point_lights_expand_to_discrete_uniforms_on_generation_one() {
    let (ctx, backend) = context(HeadlessOptions::webgl1());
    let geometry = triangle(&ctx);
    let lights = Lights::shared(&ctx, point_lights()).expect("lights");
    assert!(lights.borrow().buffer().is_none());

    let options = MaterialOptions::new(MaterialKind::Phong).with_point_lights(lights.clone());
    let mut material = Material::new(&ctx, options).expect("material");
    material.create(&ctx, &geometry).expect("create");

    let light_uniforms: Vec<_> = material
        .uniforms()
        .names()
        .filter(|n| n.starts_with("uPointLights"))
        .collect();
    assert_eq!(light_uniforms.len(), 2 * 5);
    assert_eq!(light_uniforms[0], "uPointLights[0].position");
    assert_eq!(light_uniforms[9], "uPointLights[1].intensity");

    lights.borrow_mut().lights_mut()[1].intensity = 0.25;
    material.program().bind(&ctx);
    material.set_uniforms(&ctx, Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY, Some(Vec3::Z));
    assert_eq!(
        backend.last_uniform("uPointLights[1].intensity"),
        Some(UniformValue::Float(0.25))
    );
    assert_eq!(backend.last_uniform("uCameraPosition"), Some(UniformValue::Vec3(Vec3::Z)));
}

#[test]
fn light_count_is_spliced_into_the_shader() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let geometry = triangle(&ctx);
    let lights = Lights::shared(&ctx, point_lights()).expect("lights");
    let options = MaterialOptions::new(MaterialKind::Phong).with_point_lights(lights);
    let mut material = Material::new(&ctx, options).expect("material");
    material.create(&ctx, &geometry).expect("create");

    let fragment = backend.last_shader_source(ShaderStage::Fragment).expect("source");
    assert!(fragment.contains("uPointLights[2]"));
    assert!(!fragment.contains("#HOOK_"));
}

#[test]
fn mixed_light_kinds_are_rejected() {
    let (ctx, _) = context(HeadlessOptions::webgl2());
    let err = Lights::new(&ctx, vec![Light::point(), Light::directional()]).unwrap_err();
    assert!(matches!(err, MediumError::MixedLightKinds));

    let err = Lights::new(&ctx, Vec::new()).unwrap_err();
    assert!(matches!(err, MediumError::EmptyLights));
}

#[test]
fn dispose_releases_the_program() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let geometry = triangle(&ctx);
    let mut material = Material::new(&ctx, MaterialOptions::default()).expect("material");
    material.create(&ctx, &geometry).expect("create");
    assert_eq!(backend.live_programs(), 1);

    material.dispose(&ctx);
    assert_eq!(backend.live_programs(), 0);
    assert!(!material.is_created());
}
