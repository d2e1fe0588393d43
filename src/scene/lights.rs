//! Light aggregates
//!
//! [`Lights`] batches lights of one kind. On generation 2 the batch owns a
//! uniform buffer of `kind.data_len() * len` floats that shaders read as an
//! array of structs. On generation 1 it owns no GPU state and consuming
//! materials expand every light into discrete uniforms instead.
//!
//! Aggregates are shared between the [`Scene`](crate::scene::Scene), which
//! refreshes them once per frame, and the materials that read them, hence
//! [`LightsHandle`].

use std::cell::RefCell;
use std::rc::Rc;

use crate::errors::{MediumError, Result};
use crate::renderer::backend::BufferHandle;
use crate::renderer::context::GpuContext;
use crate::renderer::uniform_buffer::UniformBuffer;
use crate::scene::light::{Light, LightKind};

/// Shared reference to a light aggregate.
pub type LightsHandle = Rc<RefCell<Lights>>;

#[derive(Debug)]
pub struct Lights {
    kind: LightKind,
    lights: Vec<Light>,
    uniform_buffer: Option<UniformBuffer>,
}

impl Lights {
    /// Builds an aggregate; all lights must share one kind.
    pub fn new(ctx: &GpuContext, lights: Vec<Light>) -> Result<Self> {
        let kind = lights.first().ok_or(MediumError::EmptyLights)?.kind();
        if lights.iter().any(|light| light.kind() != kind) {
            return Err(MediumError::MixedLightKinds);
        }

        let uniform_buffer = ctx
            .is_webgl2()
            .then(|| UniformBuffer::new(ctx, vec![0.0; kind.data_len() * lights.len()]));

        let mut aggregate = Self {
            kind,
            lights,
            uniform_buffer,
        };
        aggregate.update();
        Ok(aggregate)
    }

    /// Same as [`new`](Self::new), wrapped for sharing.
    pub fn shared(ctx: &GpuContext, lights: Vec<Light>) -> Result<LightsHandle> {
        Ok(Rc::new(RefCell::new(Self::new(ctx, lights)?)))
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> LightKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    #[must_use]
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Mutable access to the lights. Moved lights are picked up by the next
    /// [`update`](Self::update).
    pub fn lights_mut(&mut self) -> &mut [Light] {
        &mut self.lights
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Light> {
        self.lights.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Light> {
        self.lights.get_mut(index)
    }

    /// GPU uniform buffer, generation 2 only.
    #[must_use]
    pub fn buffer(&self) -> Option<BufferHandle> {
        self.uniform_buffer.as_ref().and_then(UniformBuffer::buffer)
    }

    /// Staging data of the uniform buffer, empty on generation 1.
    #[must_use]
    pub fn buffer_data(&self) -> &[f32] {
        self.uniform_buffer
            .as_ref()
            .map(UniformBuffer::data)
            .unwrap_or_default()
    }

    /// Refreshes every light and, on generation 2, copies the packed records
    /// into the staging array.
    pub fn update(&mut self) {
        let stride = self.kind.data_len();
        for (i, light) in self.lights.iter_mut().enumerate() {
            light.update();
            if let Some(uniform_buffer) = self.uniform_buffer.as_mut() {
                uniform_buffer.set_values(light.data(), i * stride);
            }
        }
    }

    /// Uploads the staging array. The binding point was associated when the
    /// consuming material was created.
    pub fn bind(&self, ctx: &GpuContext) {
        if let Some(uniform_buffer) = &self.uniform_buffer {
            uniform_buffer.upload(ctx);
        }
    }

    pub fn dispose(&mut self, ctx: &GpuContext) {
        if let Some(uniform_buffer) = self.uniform_buffer.as_mut() {
            uniform_buffer.dispose(ctx);
        }
    }
}
