//! Textures
//!
//! Three kinds, matching the sampler uniform tags:
//!
//! - [`Texture`] (`t`): 2D, RGBA8 pixels or float RGBA data (generation 2)
//! - [`TextureCube`] (`tc`): six 2D faces
//! - [`Texture3d`] (`t3d`): single-channel volume, generation 2 only
//! - [`TextureVideo`] (`t`): a 2D texture refreshed with video frames
//!
//! Image decoding and fetching happen outside this crate. A texture is
//! created with a 1x1 placeholder and sits in [`TextureState::Pending`]
//! until the caller hands over decoded pixels ([`Texture::update`]) or
//! reports a load failure ([`Texture::fail`]).

use crate::errors::{MediumError, Result};
use crate::renderer::backend::{
    ImageTarget, PixelFormat, TextureFilter, TextureHandle, TextureParameter, TextureTarget,
    TextureWrap,
};
use crate::renderer::context::GpuContext;
use crate::resources::uniforms::UniformValue;
use crate::utils::{is_power_of_two, nearest_power_of_two};

// ============================================================================
// Options & image data
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureOptions {
    /// Default: [`TextureFilter::Nearest`].
    pub mag_filter: TextureFilter,
    /// Default: [`TextureFilter::Nearest`].
    pub min_filter: TextureFilter,
    /// Default: [`TextureWrap::ClampToEdge`].
    pub wrap_s: TextureWrap,
    /// Default: [`TextureWrap::ClampToEdge`].
    pub wrap_t: TextureWrap,
    /// Flip rows on upload. Default: `true`.
    pub flip_y: bool,
    /// Resample 8-bit images to a square power-of-two size before upload.
    /// Default: `false`.
    pub resize_to_pow2: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            mag_filter: TextureFilter::Nearest,
            min_filter: TextureFilter::Nearest,
            wrap_s: TextureWrap::ClampToEdge,
            wrap_t: TextureWrap::ClampToEdge,
            flip_y: true,
            resize_to_pow2: false,
        }
    }
}

impl TextureOptions {
    /// Defaults of cube maps: linear filtering, no flip.
    #[must_use]
    pub fn cube() -> Self {
        Self {
            mag_filter: TextureFilter::Linear,
            min_filter: TextureFilter::Linear,
            flip_y: false,
            ..Self::default()
        }
    }

    fn apply(&self, ctx: &GpuContext, target: TextureTarget) {
        let gl = ctx.gl();
        gl.tex_parameter(target, TextureParameter::MagFilter(self.mag_filter));
        gl.tex_parameter(target, TextureParameter::MinFilter(self.min_filter));
        gl.tex_parameter(target, TextureParameter::WrapS(self.wrap_s));
        gl.tex_parameter(target, TextureParameter::WrapT(self.wrap_t));
    }
}

/// Texel storage of a decoded image.
#[derive(Debug, Clone, PartialEq)]
pub enum TexelData {
    /// 4 bytes per texel.
    Rgba8(Vec<u8>),
    /// 4 floats per texel (HDR data).
    RgbaF32(Vec<f32>),
}

/// A decoded image, ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub data: TexelData,
}

impl TextureImage {
    #[must_use]
    pub fn rgba8(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: TexelData::Rgba8(data),
        }
    }

    #[must_use]
    pub fn rgba_f32(width: u32, height: u32, data: Vec<f32>) -> Self {
        Self {
            width,
            height,
            data: TexelData::RgbaF32(data),
        }
    }

    /// Transparent 1x1 image used until real pixels arrive.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::rgba8(1, 1, vec![0; 4])
    }

    #[must_use]
    pub fn is_power_of_two(&self) -> bool {
        is_power_of_two(self.width) && is_power_of_two(self.height)
    }

    /// Nearest-neighbour resample to a square power-of-two size.
    ///
    /// Float images and images already power-of-two sized are returned
    /// unchanged.
    #[must_use]
    pub fn resized_to_power_of_two(&self) -> Self {
        let TexelData::Rgba8(pixels) = &self.data else {
            return self.clone();
        };
        if self.is_power_of_two() {
            return self.clone();
        }

        let size = nearest_power_of_two(self.width.max(self.height));
        let mut out = vec![0u8; (size * size * 4) as usize];
        for y in 0..size {
            let sy = (u64::from(y) * u64::from(self.height) / u64::from(size)) as u32;
            for x in 0..size {
                let sx = (u64::from(x) * u64::from(self.width) / u64::from(size)) as u32;
                let src = ((sy * self.width + sx) * 4) as usize;
                let dst = ((y * size + x) * 4) as usize;
                if let (Some(from), Some(to)) = (pixels.get(src..src + 4), out.get_mut(dst..dst + 4)) {
                    to.copy_from_slice(from);
                }
            }
        }
        Self::rgba8(size, size, out)
    }

    fn upload(&self, ctx: &GpuContext, target: ImageTarget) {
        let (width, height) = (self.width as i32, self.height as i32);
        match &self.data {
            TexelData::Rgba8(pixels) => {
                ctx.gl()
                    .tex_image_2d(target, width, height, PixelFormat::Rgba8, Some(pixels));
            }
            TexelData::RgbaF32(texels) if ctx.is_webgl2() => {
                ctx.gl().tex_image_2d(
                    target,
                    width,
                    height,
                    PixelFormat::Rgba16Float,
                    Some(bytemuck::cast_slice(texels)),
                );
            }
            TexelData::RgbaF32(_) => {
                log::warn!("Float texture data requires WebGL2, upload skipped");
            }
        }
    }
}

/// Load state of a texture fed by an external loader.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TextureState {
    /// Holding the placeholder.
    #[default]
    Pending,
    Loaded,
    Failed(String),
}

// ============================================================================
// Texture
// ============================================================================

#[derive(Debug)]
pub struct Texture {
    texture: Option<TextureHandle>,
    options: TextureOptions,
    state: TextureState,
    width: u32,
    height: u32,
}

impl Texture {
    pub fn new(ctx: &GpuContext, options: TextureOptions) -> Result<Self> {
        let gl = ctx.gl();
        let texture = gl
            .create_texture()
            .ok_or(MediumError::ResourceCreation("texture"))?;

        gl.bind_texture(TextureTarget::Texture2d, Some(texture));
        TextureImage::placeholder().upload(ctx, ImageTarget::Texture2d);
        options.apply(ctx, TextureTarget::Texture2d);
        gl.bind_texture(TextureTarget::Texture2d, None);

        Ok(Self {
            texture: Some(texture),
            options,
            state: TextureState::Pending,
            width: 1,
            height: 1,
        })
    }

    /// Creates a texture and uploads `image` right away.
    pub fn from_image(ctx: &GpuContext, image: &TextureImage, options: TextureOptions) -> Result<Self> {
        let mut texture = Self::new(ctx, options)?;
        texture.update(ctx, image);
        Ok(texture)
    }

    /// Uploads decoded pixels and marks the texture loaded.
    pub fn update(&mut self, ctx: &GpuContext, image: &TextureImage) {
        let Some(texture) = self.texture else {
            log::warn!("Texture update after dispose ignored");
            return;
        };
        let image = if self.options.resize_to_pow2 {
            image.resized_to_power_of_two()
        } else {
            image.clone()
        };

        let gl = ctx.gl();
        gl.bind_texture(TextureTarget::Texture2d, Some(texture));
        gl.pixel_store_flip_y(self.options.flip_y);
        image.upload(ctx, ImageTarget::Texture2d);
        if self.options.min_filter == TextureFilter::LinearMipmapLinear {
            if image.is_power_of_two() || ctx.is_webgl2() {
                gl.generate_mipmap(TextureTarget::Texture2d);
            } else {
                log::warn!(
                    "Mipmaps need power-of-two sizes on WebGL1, got {}x{}",
                    image.width,
                    image.height
                );
            }
        }
        gl.bind_texture(TextureTarget::Texture2d, None);

        self.width = image.width;
        self.height = image.height;
        self.state = TextureState::Loaded;
    }

    /// Records a load failure. The placeholder stays bound.
    pub fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        log::warn!("Texture failed to load: {error}");
        self.state = TextureState::Failed(error);
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &TextureState {
        &self.state
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> Option<TextureHandle> {
        self.texture
    }

    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// `t` uniform value bound to this texture.
    #[must_use]
    pub fn uniform(&self) -> Option<UniformValue> {
        self.texture.map(UniformValue::Texture)
    }

    pub fn dispose(&mut self, ctx: &GpuContext) {
        if let Some(texture) = self.texture.take() {
            ctx.gl().delete_texture(texture);
        }
    }
}

// ============================================================================
// TextureCube
// ============================================================================

#[derive(Debug)]
pub struct TextureCube {
    texture: Option<TextureHandle>,
    options: TextureOptions,
    state: TextureState,
}

impl TextureCube {
    pub fn new(ctx: &GpuContext, options: TextureOptions) -> Result<Self> {
        let texture = ctx
            .gl()
            .create_texture()
            .ok_or(MediumError::ResourceCreation("cube texture"))?;
        let mut cube = Self {
            texture: Some(texture),
            options,
            state: TextureState::Pending,
        };
        let placeholder = TextureImage::placeholder();
        cube.upload_faces(ctx, std::array::from_fn(|_| &placeholder));
        Ok(cube)
    }

    /// Uploads the six faces in `+X, -X, +Y, -Y, +Z, -Z` order.
    pub fn update(&mut self, ctx: &GpuContext, faces: &[TextureImage; 6]) {
        if self.texture.is_none() {
            log::warn!("Cube texture update after dispose ignored");
            return;
        }
        if self.options.resize_to_pow2 {
            let resized: [TextureImage; 6] = std::array::from_fn(|i| faces[i].resized_to_power_of_two());
            self.upload_faces(ctx, std::array::from_fn(|i| &resized[i]));
        } else {
            self.upload_faces(ctx, std::array::from_fn(|i| &faces[i]));
        }
        self.state = TextureState::Loaded;
    }

    fn upload_faces(&self, ctx: &GpuContext, faces: [&TextureImage; 6]) {
        let gl = ctx.gl();
        gl.bind_texture(TextureTarget::CubeMap, self.texture);
        gl.pixel_store_flip_y(self.options.flip_y);
        for (face, image) in (0u8..).zip(faces) {
            image.upload(ctx, ImageTarget::CubeFace(face));
        }
        self.options.apply(ctx, TextureTarget::CubeMap);
        gl.bind_texture(TextureTarget::CubeMap, None);
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        log::warn!("Cube texture failed to load: {error}");
        self.state = TextureState::Failed(error);
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &TextureState {
        &self.state
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// `tc` uniform value bound to this texture.
    #[must_use]
    pub fn uniform(&self) -> Option<UniformValue> {
        self.texture.map(UniformValue::TextureCube)
    }

    pub fn dispose(&mut self, ctx: &GpuContext) {
        if let Some(texture) = self.texture.take() {
            ctx.gl().delete_texture(texture);
        }
    }
}

// ============================================================================
// Texture3d
// ============================================================================

/// Cubic single-channel volume with a full mip chain.
#[derive(Debug)]
pub struct Texture3d {
    texture: Option<TextureHandle>,
    size: i32,
}

impl Texture3d {
    /// `data` holds `size³` bytes. Returns `None` (with a warning) on
    /// generation 1 or when the driver refuses the texture.
    pub fn new(ctx: &GpuContext, data: &[u8], size: u32) -> Option<Self> {
        if !ctx.is_webgl2() {
            log::warn!("3D textures require WebGL2");
            return None;
        }

        let gl = ctx.gl();
        let texture = gl.create_texture()?;
        let size = i32::try_from(size).unwrap_or(i32::MAX);
        let max_level = (size.max(1) as f32).log2() as i32;

        gl.active_texture(0);
        gl.bind_texture(TextureTarget::Texture3d, Some(texture));
        gl.tex_parameter(TextureTarget::Texture3d, TextureParameter::BaseLevel(0));
        gl.tex_parameter(TextureTarget::Texture3d, TextureParameter::MaxLevel(max_level));
        gl.tex_parameter(
            TextureTarget::Texture3d,
            TextureParameter::MinFilter(TextureFilter::LinearMipmapLinear),
        );
        gl.tex_parameter(
            TextureTarget::Texture3d,
            TextureParameter::MagFilter(TextureFilter::Linear),
        );
        gl.tex_image_3d(size, size, size, PixelFormat::R8, Some(data));
        gl.generate_mipmap(TextureTarget::Texture3d);
        gl.bind_texture(TextureTarget::Texture3d, None);

        Some(Self {
            texture: Some(texture),
            size,
        })
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> Option<TextureHandle> {
        self.texture
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> i32 {
        self.size
    }

    /// `t3d` uniform value bound to this texture.
    #[must_use]
    pub fn uniform(&self) -> Option<UniformValue> {
        self.texture.map(UniformValue::Texture3d)
    }

    pub fn dispose(&mut self, ctx: &GpuContext) {
        if let Some(texture) = self.texture.take() {
            ctx.gl().delete_texture(texture);
        }
    }
}

// ============================================================================
// TextureVideo
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoOptions {
    pub texture: TextureOptions,
    /// Restart from the first frame after [`VideoEvent::Ended`]. Default: `false`.
    pub looping: bool,
    /// Default: `true`.
    pub autoplay: bool,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            texture: TextureOptions::default(),
            looping: false,
            autoplay: true,
        }
    }
}

/// Playback signals raised by the video source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEvent {
    CanPlayThrough,
    Ended,
}

/// 2D texture fed with decoded video frames.
///
/// The host owns the video element and forwards its signals:
/// [`can_play_through`](Self::can_play_through) marks the texture loaded,
/// [`ended`](Self::ended) the end of playback and [`fail`](Self::fail) a
/// media error. Frames are uploaded only when the playback time moved.
#[derive(Debug)]
pub struct TextureVideo {
    texture: Texture,
    options: VideoOptions,
    state: TextureState,
    current_time: Option<f64>,
    events: Vec<VideoEvent>,
}

impl TextureVideo {
    pub fn new(ctx: &GpuContext, options: VideoOptions) -> Result<Self> {
        let texture_options = TextureOptions {
            flip_y: true,
            resize_to_pow2: false,
            ..options.texture
        };
        Ok(Self {
            texture: Texture::new(ctx, texture_options)?,
            options,
            state: TextureState::Pending,
            current_time: None,
            events: Vec::new(),
        })
    }

    /// Uploads `frame` when `current_time` differs from the last uploaded
    /// frame's time. Returns whether an upload happened.
    pub fn update(&mut self, ctx: &GpuContext, frame: &TextureImage, current_time: f64) -> bool {
        if self.current_time == Some(current_time) {
            return false;
        }
        self.texture.update(ctx, frame);
        self.current_time = Some(current_time);
        true
    }

    pub fn can_play_through(&mut self) {
        if self.state == TextureState::Pending {
            self.state = TextureState::Loaded;
        }
        self.events.push(VideoEvent::CanPlayThrough);
    }

    /// End of playback. A looping video accepts its first frame again.
    pub fn ended(&mut self) {
        if self.options.looping {
            self.current_time = None;
        }
        self.events.push(VideoEvent::Ended);
    }

    /// Records a media error. The last uploaded frame stays bound.
    pub fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        log::warn!("Video texture failed: {error}");
        self.state = TextureState::Failed(error);
    }

    /// Signals received since the last call.
    pub fn drain_events(&mut self) -> Vec<VideoEvent> {
        std::mem::take(&mut self.events)
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &TextureState {
        &self.state
    }

    #[must_use]
    pub fn options(&self) -> &VideoOptions {
        &self.options
    }

    #[must_use]
    pub fn current_time(&self) -> Option<f64> {
        self.current_time
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> Option<TextureHandle> {
        self.texture.handle()
    }

    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.texture.size()
    }

    /// `t` uniform value bound to this texture.
    #[must_use]
    pub fn uniform(&self) -> Option<UniformValue> {
        self.texture.uniform()
    }

    pub fn dispose(&mut self, ctx: &GpuContext) {
        self.texture.dispose(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_keeps_power_of_two_images() {
        let image = TextureImage::rgba8(4, 2, vec![7; 32]);
        assert_eq!(image.resized_to_power_of_two(), image);
    }

    #[test]
    fn resize_samples_nearest_texel() {
        // 3x1: red, green, blue
        let image = TextureImage::rgba8(
            3,
            1,
            vec![255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255],
        );
        let resized = image.resized_to_power_of_two();
        assert_eq!((resized.width, resized.height), (4, 4));
        let TexelData::Rgba8(pixels) = resized.data else {
            panic!("expected 8-bit data");
        };
        assert_eq!(&pixels[0..4], &[255, 0, 0, 255]);
        assert_eq!(&pixels[12..16], &[0, 0, 255, 255]);
    }
}
