//! Scene, Mesh & Renderer Tests
//!
//! Tests for:
//! - The per-mesh draw protocol (program, culling, blending, layout, draw)
//! - Vertex layout rebinding without vertex array objects
//! - Instanced drawing
//! - Scene membership and disposal
//! - Frame order of `Renderer::render` and `RenderTarget::render`

use glam::Vec3;

use medium::renderer::backend::headless::{Call, HeadlessBackend, HeadlessOptions};
use medium::renderer::backend::{
    BlendFactor, BufferTarget, Capability, ClearMask, CullFace, DrawMode,
};
use medium::renderer::{GpuContext, HeadlessProvider, Precision, Renderer, RendererSettings};
use medium::resources::SharedMaterial;
use medium::scene::{Camera, Light, Lights, Mesh, Scene};
use medium::{
    Culling, Geometry, GeometryData, Material, MaterialOptions, RenderTarget,
    RenderTargetSettings, ShaderHooks,
};

fn context(options: HeadlessOptions) -> (GpuContext, HeadlessBackend) {
    let backend = HeadlessBackend::new(options);
    let ctx = GpuContext::new(Box::new(backend.clone()), Precision::Highp);
    (ctx, backend)
}

fn triangle_data() -> GeometryData {
    GeometryData::new(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
        .with_normals(vec![0.0, 0.0, 1.0].repeat(3))
}

fn material(ctx: &GpuContext, options: MaterialOptions) -> SharedMaterial {
    Material::shared(ctx, options).expect("material")
}

fn mesh(ctx: &GpuContext, data: GeometryData, options: MaterialOptions) -> Mesh {
    let geometry = Geometry::new(ctx, data).expect("geometry");
    Mesh::new(ctx, geometry, material(ctx, options)).expect("mesh")
}

fn position_of(calls: &[Call], predicate: impl Fn(&Call) -> bool) -> usize {
    calls
        .iter()
        .position(predicate)
        .unwrap_or_else(|| panic!("call not recorded in {calls:#?}"))
}

// ============================================================================
// Draw protocol
// ============================================================================

#[test]
fn draw_issues_one_array_draw() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let mut mesh = mesh(&ctx, triangle_data(), MaterialOptions::default());
    backend.clear_calls();

    mesh.draw(&ctx, &Camera::default());

    let calls = backend.calls();
    assert_eq!(backend.draw_calls(), 1);
    assert!(calls.contains(&Call::DrawArrays {
        mode: DrawMode::Triangles,
        count: 3,
        instances: None,
    }));

    let program = position_of(&calls, |c| matches!(c, Call::UseProgram(Some(_))));
    let uniforms = position_of(&calls, |c| matches!(c, Call::Uniform { .. }));
    let vao = position_of(&calls, |c| matches!(c, Call::BindVertexArray(Some(_))));
    let draw = position_of(&calls, Call::is_draw);
    let unbind = position_of(&calls, |c| matches!(c, Call::BindVertexArray(None)));
    assert!(program < uniforms && uniforms < vao && vao < draw && draw < unbind);
}

#[test]
fn indexed_geometry_uses_draw_elements() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let data = triangle_data().with_indices(vec![0, 1, 2]);
    let mut mesh = mesh(&ctx, data, MaterialOptions::default());

    mesh.draw(&ctx, &Camera::default());
    assert!(backend.calls().contains(&Call::DrawElements {
        mode: DrawMode::Triangles,
        count: 3,
        instances: None,
    }));
}

#[test]
fn draw_mode_comes_from_the_material() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let options = MaterialOptions {
        draw_mode: DrawMode::Points,
        ..MaterialOptions::default()
    };
    let mut mesh = mesh(&ctx, triangle_data(), options);

    mesh.draw(&ctx, &Camera::default());
    assert!(backend.calls().contains(&Call::DrawArrays {
        mode: DrawMode::Points,
        count: 3,
        instances: None,
    }));
}

#[test]
fn culling_is_enabled_for_the_draw_only() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let options = MaterialOptions {
        culling: Culling::Back,
        ..MaterialOptions::default()
    };
    let mut mesh = mesh(&ctx, triangle_data(), options);
    backend.clear_calls();

    mesh.draw(&ctx, &Camera::default());

    let calls = backend.calls();
    let enable = position_of(&calls, |c| *c == Call::Enable(Capability::CullFace));
    let face = position_of(&calls, |c| *c == Call::CullFace(CullFace::Back));
    let draw = position_of(&calls, Call::is_draw);
    let disable = position_of(&calls, |c| *c == Call::Disable(Capability::CullFace));
    assert!(enable < face && face < draw && draw < disable);
    assert!(!backend.is_enabled(Capability::CullFace));
}

#[test]
fn no_culling_leaves_the_state_alone() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let mut mesh = mesh(&ctx, triangle_data(), MaterialOptions::default());
    backend.clear_calls();

    mesh.draw(&ctx, &Camera::default());
    assert_eq!(
        backend.count_calls(|c| matches!(
            c,
            Call::Enable(Capability::CullFace) | Call::CullFace(_)
        )),
        0
    );
}

#[test]
fn plain_draw_never_blends() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let options = MaterialOptions {
        blending: true,
        ..MaterialOptions::default()
    };
    let mut mesh = mesh(&ctx, triangle_data(), options);
    backend.clear_calls();

    mesh.draw(&ctx, &Camera::default());
    assert_eq!(
        backend.count_calls(|c| matches!(c, Call::Enable(Capability::Blend) | Call::BlendFunc(..))),
        0
    );
}

#[test]
fn invisible_mesh_is_skipped() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let mut mesh = mesh(&ctx, triangle_data(), MaterialOptions::default());
    mesh.visible = false;

    mesh.draw(&ctx, &Camera::default());
    assert_eq!(backend.draw_calls(), 0);
}

#[test]
fn model_matrices_follow_the_transform() {
    let (ctx, _) = context(HeadlessOptions::webgl2());
    let mut mesh = mesh(&ctx, triangle_data(), MaterialOptions::default());
    let mut camera = Camera::default().with_position(Vec3::new(0.0, 0.0, 5.0));
    camera.update_matrix_world();

    mesh.transform.position = Vec3::new(1.0, 0.0, 0.0);
    mesh.draw(&ctx, &camera);

    assert_eq!(mesh.model_matrix().w_axis.truncate(), Vec3::new(1.0, 0.0, 0.0));
    assert_eq!(
        mesh.model_view_matrix(),
        camera.world_inverse_matrix() * mesh.model_matrix()
    );
}

// ============================================================================
// Vertex layout
// ============================================================================

#[test]
fn vao_records_the_layout_once() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let mut mesh = mesh(&ctx, triangle_data(), MaterialOptions::default());
    backend.clear_calls();

    mesh.draw(&ctx, &Camera::default());
    mesh.draw(&ctx, &Camera::default());
    assert_eq!(
        backend.count_calls(|c| matches!(c, Call::VertexAttribPointer { .. })),
        0
    );
    assert_eq!(backend.draw_calls(), 2);
}

#[test]
fn attributes_are_rebound_without_vaos() {
    let (ctx, backend) = context(HeadlessOptions::webgl1().with_extensions(&[]));
    assert!(!ctx.extensions().has_vertex_array_object());
    let data = triangle_data().with_indices(vec![0, 1, 2]);
    let mut mesh = mesh(&ctx, data, MaterialOptions::default());
    backend.clear_calls();

    mesh.draw(&ctx, &Camera::default());
    mesh.draw(&ctx, &Camera::default());

    assert_eq!(backend.count_calls(|c| matches!(c, Call::BindVertexArray(_))), 0);
    assert_eq!(
        backend.count_calls(|c| matches!(c, Call::VertexAttribPointer { size: 3, .. })),
        2 * 2
    );
    assert_eq!(
        backend.count_calls(|c| matches!(
            c,
            Call::BindBuffer(BufferTarget::ElementArray, Some(_))
        )),
        2
    );
    assert_eq!(backend.draw_calls(), 2);
}

// ============================================================================
// Instancing
// ============================================================================

fn instanced_mesh(ctx: &GpuContext, options: MaterialOptions) -> Mesh {
    let mut geometry = Geometry::new(ctx, triangle_data()).expect("geometry");
    geometry
        .add_instanced_attribute(ctx, "aOffset", &[0.0; 12], 3)
        .expect("instanced attribute");
    let options = MaterialOptions {
        hooks: ShaderHooks::new().with_vertex_pre("in vec3 aOffset;"),
        ..options
    };
    let mut mesh = Mesh::new(ctx, geometry, material(ctx, options)).expect("mesh");
    mesh.set_instance_count(4);
    mesh
}

#[test]
fn instanced_draw_uses_the_divisor() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let mut mesh = instanced_mesh(&ctx, MaterialOptions::default());
    assert!(mesh.is_instanced());
    assert_eq!(
        backend.count_calls(|c| matches!(c, Call::VertexAttribDivisor { divisor: 1, .. })),
        1
    );

    mesh.draw_instanced(&ctx, &Camera::default());
    assert!(backend.calls().contains(&Call::DrawArrays {
        mode: DrawMode::Triangles,
        count: 3,
        instances: Some(4),
    }));
}

#[test]
fn instanced_draw_toggles_blending() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let options = MaterialOptions {
        blending: true,
        blend_function: (BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha),
        ..MaterialOptions::default()
    };
    let mut mesh = instanced_mesh(&ctx, options);
    backend.clear_calls();

    mesh.draw_instanced(&ctx, &Camera::default());

    let calls = backend.calls();
    let enable = position_of(&calls, |c| *c == Call::Enable(Capability::Blend));
    let func = position_of(&calls, |c| {
        *c == Call::BlendFunc(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha)
    });
    let draw = position_of(&calls, Call::is_draw);
    let disable = position_of(&calls, |c| *c == Call::Disable(Capability::Blend));
    assert!(enable < func && func < draw && draw < disable);
}

#[test]
fn instanced_draw_is_skipped_without_support() {
    let (ctx, backend) = context(HeadlessOptions::webgl1().with_extensions(&[]));
    let mut mesh = instanced_mesh(&ctx, MaterialOptions::default());

    mesh.draw_instanced(&ctx, &Camera::default());
    assert_eq!(backend.draw_calls(), 0);
}

// ============================================================================
// Scene
// ============================================================================

#[test]
fn scene_add_and_remove() {
    let (ctx, _) = context(HeadlessOptions::webgl2());
    let mut scene = Scene::new();
    let a = scene.add(mesh(&ctx, triangle_data(), MaterialOptions::default()));
    let b = scene.add(mesh(&ctx, triangle_data(), MaterialOptions::default()));
    assert_eq!(scene.len(), 2);

    let removed = scene.remove(a).expect("removed");
    assert_eq!(removed.id(), a);
    assert_eq!(scene.len(), 1);
    assert!(scene.remove(a).is_none());
    assert!(scene.get(b).is_some());
}

#[test]
fn remove_and_dispose_releases_gpu_objects() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let mut scene = Scene::new();
    let id = scene.add(mesh(&ctx, triangle_data(), MaterialOptions::default()));
    let buffers = backend.live_buffers();

    assert!(scene.remove_and_dispose(&ctx, id));
    assert!(scene.is_empty());
    assert_eq!(backend.live_buffers(), buffers - 2);
    assert_eq!(backend.live_programs(), 0);
    assert!(!scene.remove_and_dispose(&ctx, id));
}

#[test]
fn shared_material_outlives_one_mesh() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let shared = material(&ctx, MaterialOptions::default());
    let first = Geometry::new(&ctx, triangle_data()).expect("geometry");
    let second = Geometry::new(&ctx, triangle_data()).expect("geometry");

    let mut scene = Scene::new();
    let a = scene.add(Mesh::new(&ctx, first, shared.clone()).expect("mesh"));
    let b = scene.add(Mesh::new(&ctx, second, shared.clone()).expect("mesh"));
    drop(shared);
    assert_eq!(backend.count_calls(|c| matches!(c, Call::LinkProgram { .. })), 1);

    scene.remove_and_dispose(&ctx, a);
    assert_eq!(backend.live_programs(), 1);
    scene.remove_and_dispose(&ctx, b);
    assert_eq!(backend.live_programs(), 0);
}

#[test]
fn scene_update_uploads_light_buffers() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let lights = Lights::shared(&ctx, vec![Light::directional()]).expect("lights");
    let scene = Scene::new().with_directional_lights(lights.clone());
    backend.clear_calls();

    lights.borrow_mut().lights_mut()[0].intensity = 0.5;
    scene.update(&ctx);

    assert_eq!(lights.borrow().buffer_data()[8], 0.5);
    assert!(backend.calls().contains(&Call::BufferSubData {
        target: BufferTarget::Uniform,
        offset: 0,
        len: 12 * 4,
    }));
}

#[test]
fn scene_update_keeps_the_block_binding() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let lights = Lights::shared(&ctx, vec![Light::directional()]).expect("lights");
    let scene = Scene::new().with_directional_lights(lights);
    backend.clear_calls();

    scene.update(&ctx);
    scene.update(&ctx);

    assert_eq!(
        backend.count_calls(|c| matches!(c, Call::BindBufferBase { .. })),
        0
    );
    assert_eq!(
        backend.count_calls(|c| matches!(c, Call::BufferSubData { .. })),
        2
    );
}

// ============================================================================
// Renderer
// ============================================================================

#[test]
fn render_clears_then_draws_in_order() {
    let provider = HeadlessProvider::default();
    let renderer = Renderer::new(&provider, RendererSettings::default()).expect("renderer");
    let backend = provider.backend().expect("backend");
    let ctx = renderer.context();

    let mut scene = Scene::new();
    let first = scene.add(mesh(ctx, triangle_data(), MaterialOptions::default()));
    scene.add(mesh(ctx, triangle_data().with_indices(vec![0, 1, 2]), MaterialOptions::default()));
    let mut camera = Camera::default().with_position(Vec3::new(0.0, 0.0, 5.0));
    backend.clear_calls();

    renderer.render(&mut scene, &mut camera);

    let calls = backend.calls();
    let clear = position_of(&calls, |c| *c == Call::Clear(ClearMask::COLOR | ClearMask::DEPTH));
    let projection = position_of(&calls, |c| {
        matches!(c, Call::BufferSubData { target: BufferTarget::Uniform, len: 64, .. })
    });
    let arrays = position_of(&calls, |c| matches!(c, Call::DrawArrays { .. }));
    let elements = position_of(&calls, |c| matches!(c, Call::DrawElements { .. }));
    assert!(clear < projection && projection < arrays && arrays < elements);
    assert_eq!(backend.draw_calls(), 2);
    assert!(scene.get(first).is_some());
}

#[test]
fn auto_clear_off_skips_clear() {
    let provider = HeadlessProvider::default();
    let mut renderer = Renderer::new(&provider, RendererSettings::default()).expect("renderer");
    renderer.set_auto_clear(false);
    let backend = provider.backend().expect("backend");
    backend.clear_calls();

    renderer.render(&mut Scene::new(), &mut Camera::default());
    assert_eq!(backend.count_calls(|c| matches!(c, Call::Clear(_))), 0);
}

#[test]
fn generation_one_uploads_projection_as_uniform() {
    let provider = HeadlessProvider::default().with_available(&[medium::Generation::Gen1]);
    let renderer = Renderer::new(&provider, RendererSettings::default()).expect("renderer");
    let backend = provider.backend().expect("backend");
    let ctx = renderer.context();

    let mut scene = Scene::new();
    scene.add(mesh(ctx, triangle_data(), MaterialOptions::default()));
    let mut camera = Camera::default();
    renderer.render(&mut scene, &mut camera);

    assert_eq!(
        backend.last_uniform("uProjectionMatrix"),
        Some(medium::UniformValue::Mat4(camera.projection_matrix()))
    );
    assert_eq!(
        backend.count_calls(|c| matches!(c, Call::BufferSubData { target: BufferTarget::Uniform, .. })),
        0
    );
}

#[test]
fn viewport_and_scissor_scale_by_pixel_ratio() {
    let provider = HeadlessProvider::default();
    let settings = RendererSettings {
        pixel_ratio: 2.0,
        ..RendererSettings::default()
    };
    let mut renderer = Renderer::new(&provider, settings).expect("renderer");
    let backend = provider.backend().expect("backend");

    renderer.set_viewport(10.0, 20.0, 100.0, 50.0);
    renderer.set_scissor_test(true);
    renderer.set_scissor(1.0, 2.0, 3.0, 4.0);
    renderer.render(&mut Scene::new(), &mut Camera::default());

    let calls = backend.calls();
    assert!(calls.contains(&Call::Viewport(20, 40, 200, 100)));
    assert!(calls.contains(&Call::Scissor(2, 4, 6, 8)));
    assert!(backend.is_enabled(Capability::ScissorTest));
}

#[test]
fn set_size_resizes_the_drawing_buffer() {
    let provider = HeadlessProvider::default();
    let mut renderer = Renderer::new(&provider, RendererSettings::default()).expect("renderer");
    let backend = provider.backend().expect("backend");

    renderer.set_size(320, 240);
    assert!(backend.calls().contains(&Call::ResizeDrawingBuffer(320, 240)));
    assert_eq!(renderer.viewport().width, 320);
    assert_eq!(renderer.viewport().height, 240);
}

// ============================================================================
// Render targets
// ============================================================================

#[test]
fn render_target_draws_into_its_framebuffer() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let settings = RenderTargetSettings {
        width: 256,
        height: 128,
        ..RenderTargetSettings::default()
    };
    let target = RenderTarget::new(&ctx, settings).expect("render target");
    assert!(target.texture().is_some());
    assert!(matches!(target.uniform(), Some(medium::UniformValue::Texture(_))));

    let mut scene = Scene::new();
    scene.add(mesh(&ctx, triangle_data(), MaterialOptions::default()));
    backend.clear_calls();

    target.render(&ctx, &mut scene, &mut Camera::default());

    let calls = backend.calls();
    let bind = position_of(&calls, |c| matches!(c, Call::BindFramebuffer(Some(_))));
    let draw = position_of(&calls, Call::is_draw);
    let unbind = position_of(&calls, |c| matches!(c, Call::BindFramebuffer(None)));
    assert!(bind < draw && draw < unbind);
    assert!(calls.contains(&Call::Viewport(0, 0, 256, 128)));
}

#[test]
fn render_target_dispose_is_idempotent() {
    let (ctx, backend) = context(HeadlessOptions::webgl2());
    let mut target = RenderTarget::new(&ctx, RenderTargetSettings::default()).expect("render target");
    assert_eq!(backend.live_textures(), 1);

    target.dispose(&ctx);
    target.dispose(&ctx);
    assert_eq!(backend.live_textures(), 0);
    assert!(target.texture().is_none());

    backend.clear_calls();
    target.render(&ctx, &mut Scene::new(), &mut Camera::default());
    assert!(backend.calls().is_empty());
}

#[test]
fn lit_scene_renders_on_both_generations() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    for options in [HeadlessOptions::webgl1(), HeadlessOptions::webgl2()] {
        let (ctx, backend) = context(options);
        let ambient = Lights::shared(&ctx, vec![Light::ambient()])?;
        let points = Lights::shared(
            &ctx,
            vec![Light::point().with_position(Vec3::new(0.0, 2.0, 2.0))],
        )?;
        let options = MaterialOptions::new(medium::MaterialKind::Phong)
            .with_ambient_light(ambient.clone())
            .with_point_lights(points.clone());

        let mut scene = Scene::new()
            .with_ambient_light(ambient)
            .with_point_lights(points);
        let geometry = Geometry::new(&ctx, triangle_data())?;
        scene.add(Mesh::new(&ctx, geometry, Material::shared(&ctx, options)?)?);
        scene.update(&ctx);
        let camera = Camera::default().with_position(Vec3::new(0.0, 0.0, 3.0));
        for mesh in scene.meshes_mut() {
            mesh.draw(&ctx, &camera);
        }

        assert_eq!(backend.draw_calls(), 1);
        assert_eq!(
            backend.last_uniform("uCameraPosition"),
            Some(medium::UniformValue::Vec3(Vec3::new(0.0, 0.0, 3.0)))
        );
    }
    Ok(())
}
