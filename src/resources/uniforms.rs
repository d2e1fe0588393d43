//! Uniform values and the ordered uniform map.
//!
//! A [`UniformValue`] carries both the data and the type tag of the uniform
//! declaration contract (`'i'`, `'3f'`, `'Matrix4fv'`, `'t'`, ...). The tag
//! selects the upload call in the backend and decides whether the uniform
//! takes a texture unit.
//!
//! [`UniformMap`] keeps insertion order so texture units are assigned in
//! declaration order on every run.

use std::fmt;
use std::str::FromStr;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use rustc_hash::FxHashMap;

use crate::errors::MediumError;
use crate::renderer::backend::{TextureHandle, TextureTarget, UniformLocation};

// ============================================================================
// Type tags
// ============================================================================

/// Uniform type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    IntArray,
    IVec2Array,
    FloatArray,
    Vec2Array,
    Vec3Array,
    Vec4Array,
    Mat3,
    Mat4,
    Texture,
    TextureCube,
    Texture3d,
}

impl UniformType {
    const TAGS: [(UniformType, &'static str); 16] = [
        (Self::Int, "i"),
        (Self::Float, "f"),
        (Self::Vec2, "2f"),
        (Self::Vec3, "3f"),
        (Self::Vec4, "4f"),
        (Self::IntArray, "1iv"),
        (Self::IVec2Array, "2iv"),
        (Self::FloatArray, "1fv"),
        (Self::Vec2Array, "2fv"),
        (Self::Vec3Array, "3fv"),
        (Self::Vec4Array, "4fv"),
        (Self::Mat3, "Matrix3fv"),
        (Self::Mat4, "Matrix4fv"),
        (Self::Texture, "t"),
        (Self::TextureCube, "tc"),
        (Self::Texture3d, "t3d"),
    ];

    /// The declaration tag, e.g. `"3f"`.
    #[must_use]
    pub fn tag(self) -> &'static str {
        Self::TAGS
            .iter()
            .find_map(|&(ty, tag)| (ty == self).then_some(tag))
            .unwrap_or("?")
    }

    /// Sampler kinds consume a texture unit.
    #[inline]
    #[must_use]
    pub fn is_sampler(self) -> bool {
        matches!(self, Self::Texture | Self::TextureCube | Self::Texture3d)
    }

    /// Texture binding point of sampler kinds.
    #[must_use]
    pub fn texture_target(self) -> Option<TextureTarget> {
        match self {
            Self::Texture => Some(TextureTarget::Texture2d),
            Self::TextureCube => Some(TextureTarget::CubeMap),
            Self::Texture3d => Some(TextureTarget::Texture3d),
            _ => None,
        }
    }
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for UniformType {
    type Err = MediumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::TAGS
            .iter()
            .find_map(|&(ty, tag)| (tag == s).then_some(ty))
            .ok_or_else(|| MediumError::UnknownUniformType(s.to_string()))
    }
}

// ============================================================================
// Values
// ============================================================================

/// A uniform value tagged with its declaration type.
///
/// Array variants hold flat component data (`Vec3Array` holds `3 * n` floats).
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    IntArray(Vec<i32>),
    IVec2Array(Vec<i32>),
    FloatArray(Vec<f32>),
    Vec2Array(Vec<f32>),
    Vec3Array(Vec<f32>),
    Vec4Array(Vec<f32>),
    Mat3(Mat3),
    Mat4(Mat4),
    Texture(TextureHandle),
    TextureCube(TextureHandle),
    Texture3d(TextureHandle),
}

impl UniformValue {
    #[must_use]
    pub fn kind(&self) -> UniformType {
        match self {
            Self::Int(_) => UniformType::Int,
            Self::Float(_) => UniformType::Float,
            Self::Vec2(_) => UniformType::Vec2,
            Self::Vec3(_) => UniformType::Vec3,
            Self::Vec4(_) => UniformType::Vec4,
            Self::IntArray(_) => UniformType::IntArray,
            Self::IVec2Array(_) => UniformType::IVec2Array,
            Self::FloatArray(_) => UniformType::FloatArray,
            Self::Vec2Array(_) => UniformType::Vec2Array,
            Self::Vec3Array(_) => UniformType::Vec3Array,
            Self::Vec4Array(_) => UniformType::Vec4Array,
            Self::Mat3(_) => UniformType::Mat3,
            Self::Mat4(_) => UniformType::Mat4,
            Self::Texture(_) => UniformType::Texture,
            Self::TextureCube(_) => UniformType::TextureCube,
            Self::Texture3d(_) => UniformType::Texture3d,
        }
    }

    /// The bound texture of sampler values.
    #[must_use]
    pub fn texture(&self) -> Option<TextureHandle> {
        match self {
            Self::Texture(t) | Self::TextureCube(t) | Self::Texture3d(t) => Some(*t),
            _ => None,
        }
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        Self::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        Self::Vec4(v)
    }
}

impl From<Mat3> for UniformValue {
    fn from(v: Mat3) -> Self {
        Self::Mat3(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        Self::Mat4(v)
    }
}

// ============================================================================
// Uniform map
// ============================================================================

/// One entry of a material's uniform map.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    pub value: UniformValue,
    /// Resolved after the owning program linked.
    pub location: Option<UniformLocation>,
    /// Assigned to sampler uniforms only.
    pub texture_unit: Option<u32>,
}

impl Uniform {
    #[must_use]
    pub fn new(value: UniformValue) -> Self {
        Self {
            value,
            location: None,
            texture_unit: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> UniformType {
        self.value.kind()
    }
}

/// Name → uniform map that iterates in insertion order.
#[derive(Debug, Clone, Default)]
pub struct UniformMap {
    entries: Vec<(String, Uniform)>,
    index: FxHashMap<String, usize>,
}

impl UniformMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Inserts a uniform at the end, or replaces the value of an existing one
    /// in place (keeping its position and resolved location).
    pub fn insert(&mut self, name: impl Into<String>, value: UniformValue) -> &mut Uniform {
        let name = name.into();
        let slot = if let Some(&slot) = self.index.get(&name) {
            self.entries[slot].1.value = value;
            slot
        } else {
            let slot = self.entries.len();
            self.index.insert(name.clone(), slot);
            self.entries.push((name, Uniform::new(value)));
            slot
        };
        &mut self.entries[slot].1
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Uniform> {
        self.index.get(name).map(|&slot| &self.entries[slot].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Uniform> {
        self.index.get(name).map(|&slot| &mut self.entries[slot].1)
    }

    /// Updates the value of an existing uniform.
    ///
    /// Returns `false` when the uniform is absent or `value` has a different
    /// type tag than the declared one. Texture units and upload calls are
    /// fixed by the declared type.
    pub fn set_value(&mut self, name: &str, value: UniformValue) -> bool {
        let Some(uniform) = self.get_mut(name) else {
            return false;
        };
        if uniform.kind() != value.kind() {
            log::warn!(
                "Uniform {name} is declared as '{}', ignoring a '{}' value",
                uniform.kind(),
                value.kind()
            );
            return false;
        }
        uniform.value = value;
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Uniform)> {
        self.entries.iter().map(|(name, u)| (name.as_str(), u))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Uniform)> {
        self.entries.iter_mut().map(|(name, u)| (name.as_str(), u))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Number of sampler uniforms.
    #[must_use]
    pub fn sampler_count(&self) -> usize {
        self.entries.iter().filter(|(_, u)| u.kind().is_sampler()).count()
    }
}

impl<S: Into<String>> Extend<(S, UniformValue)> for UniformMap {
    fn extend<T: IntoIterator<Item = (S, UniformValue)>>(&mut self, iter: T) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl<S: Into<String>> FromIterator<(S, UniformValue)> for UniformMap {
    fn from_iter<T: IntoIterator<Item = (S, UniformValue)>>(iter: T) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_from_str() {
        for (ty, tag) in UniformType::TAGS {
            assert_eq!(ty.tag(), tag);
            assert_eq!(tag.parse::<UniformType>().ok(), Some(ty));
        }
        assert!("mat4".parse::<UniformType>().is_err());
    }

    #[test]
    fn reinsert_keeps_position() {
        let mut map = UniformMap::new();
        map.insert("a", UniformValue::Float(1.0));
        map.insert("b", UniformValue::Int(2));
        map.insert("a", UniformValue::Float(3.0));

        let names: Vec<_> = map.names().collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(map.get("a").map(|u| &u.value), Some(&UniformValue::Float(3.0)));
    }
}
