//! Offscreen rendering into a framebuffer with an RGBA colour texture and a
//! 16-bit depth renderbuffer.

use crate::errors::{MediumError, Result};
use crate::renderer::backend::{
    ClearMask, FramebufferHandle, ImageTarget, PixelFormat, RenderbufferHandle, TextureFilter,
    TextureHandle, TextureParameter, TextureTarget, TextureWrap,
};
use crate::renderer::context::GpuContext;
use crate::renderer::settings::RenderTargetSettings;
use crate::renderer::uniform_buffer::update_projection_view;
use crate::resources::uniforms::UniformValue;
use crate::scene::camera::Camera;
use crate::scene::scene::Scene;

#[derive(Debug)]
pub struct RenderTarget {
    settings: RenderTargetSettings,
    framebuffer: Option<FramebufferHandle>,
    texture: Option<TextureHandle>,
    depth: Option<RenderbufferHandle>,
}

impl RenderTarget {
    pub fn new(ctx: &GpuContext, settings: RenderTargetSettings) -> Result<Self> {
        let gl = ctx.gl();
        let (width, height) = settings.drawing_buffer_size();

        let framebuffer = gl
            .create_framebuffer()
            .ok_or(MediumError::ResourceCreation("framebuffer"))?;
        gl.bind_framebuffer(Some(framebuffer));

        let texture = gl
            .create_texture()
            .ok_or(MediumError::ResourceCreation("render target texture"))?;
        gl.bind_texture(TextureTarget::Texture2d, Some(texture));
        for parameter in [
            TextureParameter::WrapS(TextureWrap::ClampToEdge),
            TextureParameter::WrapT(TextureWrap::ClampToEdge),
            TextureParameter::MagFilter(TextureFilter::Linear),
            TextureParameter::MinFilter(TextureFilter::Linear),
        ] {
            gl.tex_parameter(TextureTarget::Texture2d, parameter);
        }
        gl.tex_image_2d(ImageTarget::Texture2d, width, height, PixelFormat::Rgba8, None);

        let depth = gl
            .create_renderbuffer()
            .ok_or(MediumError::ResourceCreation("depth renderbuffer"))?;
        gl.bind_renderbuffer(Some(depth));
        gl.renderbuffer_depth_storage(width, height);

        gl.framebuffer_color_texture(Some(texture));
        gl.framebuffer_depth_renderbuffer(Some(depth));

        gl.bind_texture(TextureTarget::Texture2d, None);
        gl.bind_renderbuffer(None);
        gl.bind_framebuffer(None);

        log::debug!("Created {width}x{height} render target");

        Ok(Self {
            settings,
            framebuffer: Some(framebuffer),
            texture: Some(texture),
            depth: Some(depth),
        })
    }

    /// Draws `scene` into the framebuffer, then restores the default one.
    pub fn render(&self, ctx: &GpuContext, scene: &mut Scene, camera: &mut Camera) {
        let Some(framebuffer) = self.framebuffer else {
            log::warn!("Render into a disposed render target ignored");
            return;
        };
        let gl = ctx.gl();
        let (width, height) = self.settings.drawing_buffer_size();

        gl.viewport(0, 0, width, height);
        gl.bind_framebuffer(Some(framebuffer));

        if self.settings.auto_clear {
            let [r, g, b, a] = self.settings.clear_color;
            gl.clear_color(r, g, b, a);
            gl.clear(ClearMask::COLOR | ClearMask::DEPTH);
        }

        scene.update(ctx);
        camera.update_matrix_world();
        if ctx.is_webgl2() {
            update_projection_view(ctx, camera.projection_matrix());
        }
        super::draw_meshes(ctx, scene, camera);

        gl.bind_framebuffer(None);
    }

    /// Re-specifies both attachments at the new size.
    pub fn set_size(&mut self, ctx: &GpuContext, width: u32, height: u32) {
        self.settings.width = width;
        self.settings.height = height;
        let (width, height) = self.settings.drawing_buffer_size();
        let gl = ctx.gl();

        if let Some(texture) = self.texture {
            gl.bind_texture(TextureTarget::Texture2d, Some(texture));
            gl.tex_image_2d(ImageTarget::Texture2d, width, height, PixelFormat::Rgba8, None);
            gl.bind_texture(TextureTarget::Texture2d, None);
        }
        if let Some(depth) = self.depth {
            gl.bind_renderbuffer(Some(depth));
            gl.renderbuffer_depth_storage(width, height);
            gl.bind_renderbuffer(None);
        }
    }

    pub fn set_clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.settings.clear_color = [r, g, b, a];
    }

    #[must_use]
    pub fn settings(&self) -> &RenderTargetSettings {
        &self.settings
    }

    /// Colour attachment handle, `None` after dispose.
    #[inline]
    #[must_use]
    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// Colour attachment as a `t` uniform value for sampling in a later pass.
    #[must_use]
    pub fn uniform(&self) -> Option<UniformValue> {
        self.texture.map(UniformValue::Texture)
    }

    pub fn dispose(&mut self, ctx: &GpuContext) {
        let gl = ctx.gl();
        if let Some(texture) = self.texture.take() {
            gl.delete_texture(texture);
        }
        if let Some(depth) = self.depth.take() {
            gl.delete_renderbuffer(depth);
        }
        if let Some(framebuffer) = self.framebuffer.take() {
            gl.delete_framebuffer(framebuffer);
        }
    }
}
