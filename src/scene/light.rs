//! Lights
//!
//! A [`Light`] holds its live parameters plus a packed copy laid out for
//! the std140 uniform blocks of the generation-2 shaders. Every `vec3` is
//! padded to a full `vec4` and every scalar occupies its own `vec4`, so the
//! packed records are 8 (ambient), 12 (directional) and 20 (point) floats.
//!
//! On generation 1 the packed copy is unused; the consuming material reads
//! [`Light::uniform_values`] and uploads each field as its own uniform.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

use crate::resources::uniforms::UniformValue;

// ============================================================================
// GPU-side records
// ============================================================================

/// `struct AmbientLight { vec4 color; vec4 intensity; }`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct AmbientLightData {
    pub color: Vec4,
    pub intensity: Vec4,
}

/// `struct DirectionalLight { vec4 position; vec4 color; vec4 intensity; }`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DirectionalLightData {
    pub position: Vec4,
    pub color: Vec4,
    pub intensity: Vec4,
}

/// `struct PointLight { vec4 position; vec4 color; vec4 specularColor; vec4 shininess; vec4 intensity; }`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PointLightData {
    pub position: Vec4,
    pub color: Vec4,
    pub specular_color: Vec4,
    pub shininess: Vec4,
    pub intensity: Vec4,
}

#[inline]
fn scalar(v: f32) -> Vec4 {
    Vec4::new(v, 0.0, 0.0, 0.0)
}

// ============================================================================
// Light
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    Ambient,
    Directional,
    Point,
}

impl LightKind {
    /// Packed record length in floats.
    #[must_use]
    pub const fn data_len(self) -> usize {
        match self {
            Self::Ambient => size_of::<AmbientLightData>() / 4,
            Self::Directional => size_of::<DirectionalLightData>() / 4,
            Self::Point => size_of::<PointLightData>() / 4,
        }
    }

    /// Struct fields, in declaration order of the GLSL ES 1.00 struct.
    #[must_use]
    pub fn field_names(self) -> &'static [&'static str] {
        match self {
            Self::Ambient => &["color", "intensity"],
            Self::Directional => &["position", "color", "intensity"],
            Self::Point => &["position", "color", "specularColor", "shininess", "intensity"],
        }
    }

    /// Fixed uniform-block binding index.
    #[must_use]
    pub const fn binding(self) -> u32 {
        match self {
            Self::Ambient => 1,
            Self::Directional => 2,
            Self::Point => 3,
        }
    }

    /// GLSL uniform block name.
    #[must_use]
    pub const fn block_name(self) -> &'static str {
        match self {
            Self::Ambient => "AmbientLight",
            Self::Directional => "DirectionalLights",
            Self::Point => "PointLights",
        }
    }

    /// GLSL uniform (or uniform array) name.
    #[must_use]
    pub const fn uniform_name(self) -> &'static str {
        match self {
            Self::Ambient => "uAmbientLight",
            Self::Directional => "uDirectionalLights",
            Self::Point => "uPointLights",
        }
    }
}

/// A single light.
#[derive(Debug, Clone)]
pub struct Light {
    kind: LightKind,
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Point lights only.
    pub specular_color: Vec3,
    /// Point lights only.
    pub shininess: f32,
    data: Vec<f32>,
}

impl Light {
    fn with_kind(kind: LightKind, color: Vec3, intensity: f32) -> Self {
        let mut light = Self {
            kind,
            position: Vec3::ZERO,
            color,
            intensity,
            specular_color: Vec3::ONE,
            shininess: 100.0,
            data: vec![0.0; kind.data_len()],
        };
        light.update();
        light
    }

    /// Ambient light, defaults to a dim grey.
    #[must_use]
    pub fn ambient() -> Self {
        Self::with_kind(LightKind::Ambient, Vec3::splat(64.0 / 255.0), 0.1)
    }

    #[must_use]
    pub fn directional() -> Self {
        Self::with_kind(LightKind::Directional, Vec3::ONE, 1.0)
    }

    #[must_use]
    pub fn point() -> Self {
        Self::with_kind(LightKind::Point, Vec3::ONE, 1.0)
    }

    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self.update();
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self.update();
        self
    }

    #[must_use]
    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self.update();
        self
    }

    #[must_use]
    pub fn with_specular(mut self, specular_color: Vec3, shininess: f32) -> Self {
        self.specular_color = specular_color;
        self.shininess = shininess;
        self.update();
        self
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> LightKind {
        self.kind
    }

    /// Packed std140 record, refreshed by [`update`](Self::update).
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Refreshes the packed record from the live fields.
    pub fn update(&mut self) {
        match self.kind {
            LightKind::Ambient => self.write(AmbientLightData {
                color: self.color.extend(0.0),
                intensity: scalar(self.intensity),
            }),
            LightKind::Directional => self.write(DirectionalLightData {
                position: self.position.extend(0.0),
                color: self.color.extend(0.0),
                intensity: scalar(self.intensity),
            }),
            LightKind::Point => self.write(PointLightData {
                position: self.position.extend(0.0),
                color: self.color.extend(0.0),
                specular_color: self.specular_color.extend(0.0),
                shininess: scalar(self.shininess),
                intensity: scalar(self.intensity),
            }),
        }
    }

    fn write<T: Pod>(&mut self, record: T) {
        self.data
            .copy_from_slice(bytemuck::cast_slice(std::slice::from_ref(&record)));
    }

    /// Field values in [`LightKind::field_names`] order, for discrete
    /// generation-1 uniforms.
    #[must_use]
    pub fn uniform_values(&self) -> Vec<UniformValue> {
        match self.kind {
            LightKind::Ambient => vec![
                UniformValue::Vec3(self.color),
                UniformValue::Float(self.intensity),
            ],
            LightKind::Directional => vec![
                UniformValue::Vec3(self.position),
                UniformValue::Vec3(self.color),
                UniformValue::Float(self.intensity),
            ],
            LightKind::Point => vec![
                UniformValue::Vec3(self.position),
                UniformValue::Vec3(self.color),
                UniformValue::Vec3(self.specular_color),
                UniformValue::Float(self.shininess),
                UniformValue::Float(self.intensity),
            ],
        }
    }
}
