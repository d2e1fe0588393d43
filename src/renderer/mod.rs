//! Rendering
//!
//! [`Renderer`] owns the [`GpuContext`] and drives one frame per
//! [`render`](Renderer::render) call:
//!
//! 1. set the viewport and, with `auto_clear`, clear colour and depth
//! 2. refresh the scene light aggregates
//! 3. on generation 2, write the camera projection into the global block
//! 4. draw every mesh in list order
//!
//! Contexts come from a [`ContextProvider`]. The renderer asks for the
//! generations named by [`ContextPreference::candidates`] in order and fails
//! with [`MediumError::ContextUnavailable`] when none is granted.

pub mod backend;
pub mod capabilities;
pub mod context;
pub mod render_target;
pub mod settings;
pub mod uniform_buffer;
pub mod vao;

use std::cell::RefCell;

use crate::errors::{MediumError, Result};
use crate::scene::camera::Camera;
use crate::scene::scene::Scene;

use self::backend::headless::{HeadlessBackend, HeadlessOptions};
use self::backend::{Capability, ClearMask, GpuBackend};
use self::uniform_buffer::update_projection_view;

pub use self::capabilities::{Capabilities, Extensions, Precision};
pub use self::context::{Generation, GpuContext};
pub use self::render_target::RenderTarget;
pub use self::settings::{ContextPreference, RenderTargetSettings, RendererSettings};

// ============================================================================
// Context providers
// ============================================================================

/// Hands out GPU backends of a requested generation.
pub trait ContextProvider {
    /// `None` when the host cannot create a context of `generation`.
    fn request(&self, generation: Generation, settings: &RendererSettings) -> Option<Box<dyn GpuBackend>>;
}

#[cfg(target_arch = "wasm32")]
impl ContextProvider for web_sys::HtmlCanvasElement {
    fn request(&self, generation: Generation, settings: &RendererSettings) -> Option<Box<dyn GpuBackend>> {
        use self::backend::web::{WebGl2Backend, WebGlBackend};

        match generation {
            Generation::Gen2 => {
                WebGl2Backend::from_canvas(self, settings).map(|b| Box::new(b) as Box<dyn GpuBackend>)
            }
            Generation::Gen1 => {
                WebGlBackend::from_canvas(self, settings).map(|b| Box::new(b) as Box<dyn GpuBackend>)
            }
        }
    }
}

/// Creates [`HeadlessBackend`]s for the generations it is told to offer.
///
/// The last backend handed out stays reachable through
/// [`backend`](Self::backend) so callers can inspect the recorded calls.
#[derive(Debug)]
pub struct HeadlessProvider {
    options: HeadlessOptions,
    available: Vec<Generation>,
    last: RefCell<Option<HeadlessBackend>>,
}

impl HeadlessProvider {
    /// Offers both generations, configured by `options` (its `generation`
    /// field is overridden per request).
    #[must_use]
    pub fn new(options: HeadlessOptions) -> Self {
        Self {
            options,
            available: vec![Generation::Gen2, Generation::Gen1],
            last: RefCell::default(),
        }
    }

    /// Restricts the generations the emulated host can create.
    #[must_use]
    pub fn with_available(mut self, generations: &[Generation]) -> Self {
        self.available = generations.to_vec();
        self
    }

    /// Handle to the most recently created backend.
    #[must_use]
    pub fn backend(&self) -> Option<HeadlessBackend> {
        self.last.borrow().clone()
    }
}

impl Default for HeadlessProvider {
    fn default() -> Self {
        Self::new(HeadlessOptions::default())
    }
}

impl ContextProvider for HeadlessProvider {
    fn request(&self, generation: Generation, settings: &RendererSettings) -> Option<Box<dyn GpuBackend>> {
        if !self.available.contains(&generation) {
            return None;
        }
        let backend = HeadlessBackend::new(HeadlessOptions {
            generation,
            drawing_buffer_size: settings.drawing_buffer_size(),
            ..self.options.clone()
        });
        *self.last.borrow_mut() = Some(backend.clone());
        Some(Box::new(backend))
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// Viewport rectangle in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

pub struct Renderer {
    ctx: GpuContext,
    settings: RendererSettings,
    viewport: Viewport,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("generation", &self.ctx.generation())
            .field("settings", &self.settings)
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Requests a context following `settings.preference`, falling back from
    /// generation 2 to generation 1.
    pub fn new(provider: &impl ContextProvider, settings: RendererSettings) -> Result<Self> {
        let preferred = settings.preference.preferred();

        let Some((generation, backend)) = settings
            .preference
            .candidates()
            .iter()
            .find_map(|&generation| provider.request(generation, &settings).map(|b| (generation, b)))
        else {
            log::warn!(
                "Could not create a {} context, rendering is unavailable",
                preferred.context_name()
            );
            return Err(MediumError::ContextUnavailable {
                requested: preferred.context_name(),
            });
        };

        if generation != preferred {
            log::warn!(
                "{} unavailable, falling back to {}",
                preferred.context_name(),
                generation.context_name()
            );
        }

        let ctx = GpuContext::new(backend, settings.precision);
        ctx.gl().enable(Capability::DepthTest);

        let (width, height) = settings.drawing_buffer_size();
        let mut renderer = Self {
            ctx,
            settings,
            viewport: Viewport {
                x: 0,
                y: 0,
                width,
                height,
            },
        };
        renderer.set_size(renderer.settings.width, renderer.settings.height);
        Ok(renderer)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    #[inline]
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.ctx.generation()
    }

    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Resizes the drawing buffer to `width`x`height` CSS pixels scaled by
    /// the pixel ratio and resets the viewport to cover it.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.settings.width = width;
        self.settings.height = height;
        let (width, height) = self.settings.drawing_buffer_size();
        self.ctx.gl().resize_drawing_buffer(width, height);
        self.viewport = Viewport {
            x: 0,
            y: 0,
            width,
            height,
        };
        self.ctx.gl().viewport(0, 0, width, height);
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        self.settings.pixel_ratio = pixel_ratio;
        self.set_size(self.settings.width, self.settings.height);
    }

    pub fn set_clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.settings.clear_color = [r, g, b, a];
    }

    pub fn set_auto_clear(&mut self, auto_clear: bool) {
        self.settings.auto_clear = auto_clear;
    }

    /// Viewport in CSS pixels.
    pub fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let ratio = self.settings.pixel_ratio;
        self.viewport = Viewport {
            x: (x * ratio) as i32,
            y: (y * ratio) as i32,
            width: (width * ratio) as i32,
            height: (height * ratio) as i32,
        };
    }

    pub fn set_scissor_test(&self, enable: bool) {
        if enable {
            self.ctx.gl().enable(Capability::ScissorTest);
        } else {
            self.ctx.gl().disable(Capability::ScissorTest);
        }
    }

    /// Scissor box in CSS pixels.
    pub fn set_scissor(&self, x: f32, y: f32, width: f32, height: f32) {
        let ratio = self.settings.pixel_ratio;
        self.ctx.gl().scissor(
            (x * ratio) as i32,
            (y * ratio) as i32,
            (width * ratio) as i32,
            (height * ratio) as i32,
        );
    }

    // ========================================================================
    // Frame
    // ========================================================================

    pub fn render(&self, scene: &mut Scene, camera: &mut Camera) {
        let gl = self.ctx.gl();
        let Viewport {
            x,
            y,
            width,
            height,
        } = self.viewport;
        gl.viewport(x, y, width, height);

        if self.settings.auto_clear {
            let [r, g, b, a] = self.settings.clear_color;
            gl.clear_color(r, g, b, a);
            gl.clear(ClearMask::COLOR | ClearMask::DEPTH);
        }

        scene.update(&self.ctx);
        camera.update_matrix_world();
        if self.ctx.is_webgl2() {
            update_projection_view(&self.ctx, camera.projection_matrix());
        }
        draw_meshes(&self.ctx, scene, camera);
    }
}

/// Draws every scene mesh in list order.
fn draw_meshes(ctx: &GpuContext, scene: &mut Scene, camera: &Camera) {
    for mesh in scene.meshes_mut() {
        if mesh.is_instanced() {
            mesh.draw_instanced(ctx, camera);
        } else {
            mesh.draw(ctx, camera);
        }
    }
}
