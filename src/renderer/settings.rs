//! Renderer Settings
//!
//! Explicit configuration for [`Renderer`](crate::Renderer) and
//! [`RenderTarget`](crate::renderer::RenderTarget). Every field has a
//! documented default; override only what you need:
//!
//! ```rust,ignore
//! use medium::renderer::{ContextPreference, RendererSettings};
//!
//! let settings = RendererSettings {
//!     preference: ContextPreference::WebGl1,
//!     clear_color: [0.1, 0.1, 0.1, 1.0],
//!     ..Default::default()
//! };
//! ```

use crate::renderer::capabilities::Precision;
use crate::renderer::context::Generation;

// ---------------------------------------------------------------------------
// ContextPreference
// ---------------------------------------------------------------------------

/// Which WebGL generation the renderer asks for first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextPreference {
    /// Try WebGL2, fall back to WebGL1.
    #[default]
    WebGl2,
    /// WebGL1 only.
    WebGl1,
}

impl ContextPreference {
    /// Generations to request, in order.
    #[must_use]
    pub fn candidates(self) -> &'static [Generation] {
        match self {
            Self::WebGl2 => &[Generation::Gen2, Generation::Gen1],
            Self::WebGl1 => &[Generation::Gen1],
        }
    }

    #[must_use]
    pub fn preferred(self) -> Generation {
        match self {
            Self::WebGl2 => Generation::Gen2,
            Self::WebGl1 => Generation::Gen1,
        }
    }
}

// ---------------------------------------------------------------------------
// RendererSettings
// ---------------------------------------------------------------------------

/// Global configuration of the on-screen renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererSettings {
    /// CSS width of the canvas. Default: `1280`.
    pub width: u32,
    /// CSS height of the canvas. Default: `720`.
    pub height: u32,
    /// Device pixel ratio applied to the drawing buffer. Default: `1.0`.
    pub pixel_ratio: f32,
    /// Default: [`ContextPreference::WebGl2`].
    pub preference: ContextPreference,
    /// Clear color and depth before every frame. Default: `true`.
    pub auto_clear: bool,
    /// Default: opaque black.
    pub clear_color: [f32; 4],
    /// Keep the drawing buffer between frames. Default: `false`.
    pub preserve_drawing_buffer: bool,
    /// Requested float precision, downgraded when unsupported.
    /// Default: [`Precision::Highp`].
    pub precision: Precision,
    /// Default: `true`.
    pub antialias: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            pixel_ratio: 1.0,
            preference: ContextPreference::default(),
            auto_clear: true,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            preserve_drawing_buffer: false,
            precision: Precision::default(),
            antialias: true,
        }
    }
}

impl RendererSettings {
    /// Drawing buffer size in device pixels.
    #[must_use]
    pub fn drawing_buffer_size(&self) -> (i32, i32) {
        scaled_size(self.width, self.height, self.pixel_ratio)
    }
}

// ---------------------------------------------------------------------------
// RenderTargetSettings
// ---------------------------------------------------------------------------

/// Configuration of an offscreen [`RenderTarget`](crate::renderer::RenderTarget).
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetSettings {
    /// Default: `512`.
    pub width: u32,
    /// Default: `512`.
    pub height: u32,
    /// Default: `1.0`.
    pub pixel_ratio: f32,
    /// Default: `true`.
    pub auto_clear: bool,
    /// Default: opaque black.
    pub clear_color: [f32; 4],
}

impl Default for RenderTargetSettings {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            pixel_ratio: 1.0,
            auto_clear: true,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl RenderTargetSettings {
    #[must_use]
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Attachment size in pixels.
    #[must_use]
    pub fn drawing_buffer_size(&self) -> (i32, i32) {
        scaled_size(self.width, self.height, self.pixel_ratio)
    }
}

fn scaled_size(width: u32, height: u32, pixel_ratio: f32) -> (i32, i32) {
    let scale = |v: u32| (v as f32 * pixel_ratio).round().max(1.0) as i32;
    (scale(width), scale(height))
}
