//! Browser Backend Tests
//!
//! Run with `wasm-pack test --headless --firefox`. Tests for:
//! - Context selection on a real canvas
//! - Capability probing against the browser driver
//! - A lit frame through the generation 1 and generation 2 backends

#![cfg(target_arch = "wasm32")]

use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{HtmlCanvasElement, WebGl2RenderingContext};

use medium::renderer::backend::web::WebGl2Backend;
use medium::renderer::backend::{BufferTarget, BufferUsage, GpuBackend};
use medium::renderer::{ContextPreference, Generation, Renderer, RendererSettings};
use medium::scene::{Camera, Mesh, Scene};
use medium::utils::logging::init_web_logging;
use medium::{Geometry, Material, MaterialOptions, PlaneOptions, create_plane};

wasm_bindgen_test_configure!(run_in_browser);

fn canvas() -> HtmlCanvasElement {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .expect("document");
    document
        .create_element("canvas")
        .expect("canvas element")
        .dyn_into::<HtmlCanvasElement>()
        .expect("HtmlCanvasElement")
}

fn settings(preference: ContextPreference) -> RendererSettings {
    RendererSettings {
        width: 64,
        height: 64,
        preference,
        ..RendererSettings::default()
    }
}

#[wasm_bindgen_test]
fn webgl1_preference_gets_generation_one() {
    init_web_logging(log::Level::Debug);
    let renderer = Renderer::new(&canvas(), settings(ContextPreference::WebGl1)).expect("renderer");
    assert_eq!(renderer.generation(), Generation::Gen1);
    assert!(renderer.context().capabilities().max_textures >= 8);
}

#[wasm_bindgen_test]
fn renders_a_plane_on_each_generation() {
    for preference in [ContextPreference::WebGl1, ContextPreference::WebGl2] {
        let renderer = Renderer::new(&canvas(), settings(preference)).expect("renderer");
        let ctx = renderer.context();

        let geometry = Geometry::new(ctx, create_plane(PlaneOptions::default())).expect("plane");
        let material = Material::shared(ctx, MaterialOptions::default()).expect("material");
        assert!(material.borrow().is_created());

        let mut scene = Scene::new();
        scene.add(Mesh::new(ctx, geometry, material).expect("mesh"));
        let mut camera = Camera::default().with_position(glam::Vec3::new(0.0, 0.0, 3.0));
        renderer.render(&mut scene, &mut camera);
    }
}

#[wasm_bindgen_test]
fn generation_two_uploads_the_whole_slice() {
    let backend = WebGl2Backend::from_canvas(&canvas(), &settings(ContextPreference::WebGl2))
        .expect("webgl2");
    let buffer = backend.create_buffer().expect("buffer");
    backend.bind_buffer(BufferTarget::Array, Some(buffer));
    backend.buffer_data(BufferTarget::Array, &[7; 36], BufferUsage::Static);

    let size = backend
        .context()
        .get_buffer_parameter(WebGl2RenderingContext::ARRAY_BUFFER, WebGl2RenderingContext::BUFFER_SIZE);
    assert_eq!(size.as_f64(), Some(36.0));
}
