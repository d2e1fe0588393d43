//! Geometry
//!
//! [`GeometryData`] is the plain CPU description (flat position, index,
//! normal, uv and color arrays). [`Geometry`] uploads it into one
//! [`BufferAttribute`] per present array and keeps CPU records rebuilt from
//! those arrays (vertices, faces, uvs) for picking and normal recomputation.
//!
//! Attribute names are fixed: `aVertexPosition` (3), `aIndex` (element
//! array, not a shader input), `aVertexNormal` (3), `aUv` (2) and
//! `aVertexColor` (3). A missing array means no attribute and no matching
//! shader define.

use glam::{Vec2, Vec3};

use crate::errors::{MediumError, Result};
use crate::renderer::backend::BufferHandle;
use crate::renderer::context::{BufferKind, BufferSource, GpuContext};
use crate::shader::ShaderFeatures;

pub const POSITION: &str = "aVertexPosition";
pub const INDEX: &str = "aIndex";
pub const NORMAL: &str = "aVertexNormal";
pub const UV: &str = "aUv";
pub const COLOR: &str = "aVertexColor";

// ============================================================================
// GeometryData
// ============================================================================

/// Flat vertex arrays a [`Geometry`] is built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryData {
    /// Positions, stride 3.
    pub vertices: Vec<f32>,
    pub indices: Option<Vec<u16>>,
    /// Stride 3.
    pub normals: Option<Vec<f32>>,
    /// Stride 2.
    pub uvs: Option<Vec<f32>>,
    /// RGB, stride 3.
    pub colors: Option<Vec<f32>>,
}

impl GeometryData {
    #[must_use]
    pub fn new(vertices: Vec<f32>) -> Self {
        Self {
            vertices,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_indices(mut self, indices: Vec<u16>) -> Self {
        self.indices = Some(indices);
        self
    }

    #[must_use]
    pub fn with_normals(mut self, normals: Vec<f32>) -> Self {
        self.normals = Some(normals);
        self
    }

    #[must_use]
    pub fn with_uvs(mut self, uvs: Vec<f32>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    #[must_use]
    pub fn with_colors(mut self, colors: Vec<f32>) -> Self {
        self.colors = Some(colors);
        self
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Checks strides and that every index references an existing vertex.
    pub fn validate(&self) -> Result<()> {
        if self.vertices.len() % 3 != 0 {
            return Err(MediumError::InvalidGeometry(format!(
                "position array length {} is not a multiple of 3",
                self.vertices.len()
            )));
        }

        let n = self.vertex_count();
        let check = |name: &str, data: Option<&Vec<f32>>, stride: usize| match data {
            Some(data) if data.len() != n * stride => Err(MediumError::InvalidGeometry(format!(
                "{name} array holds {} values, expected {} for {n} vertices",
                data.len(),
                n * stride
            ))),
            _ => Ok(()),
        };
        check("normal", self.normals.as_ref(), 3)?;
        check("uv", self.uvs.as_ref(), 2)?;
        check("color", self.colors.as_ref(), 3)?;

        if let Some(indices) = &self.indices
            && let Some(&index) = indices.iter().find(|&&i| usize::from(i) >= n)
        {
            return Err(MediumError::InvalidGeometry(format!(
                "index {index} out of range for {n} vertices"
            )));
        }

        Ok(())
    }
}

// ============================================================================
// BufferAttribute
// ============================================================================

/// One GPU buffer plus its layout.
#[derive(Debug)]
pub struct BufferAttribute {
    kind: BufferKind,
    buffer: Option<BufferHandle>,
    item_size: i32,
    num_items: i32,
    shader_attribute: bool,
}

impl BufferAttribute {
    pub fn new(
        ctx: &GpuContext,
        kind: BufferKind,
        data: BufferSource<'_>,
        item_size: i32,
        shader_attribute: bool,
    ) -> Result<Self> {
        let buffer = ctx.create_buffer(kind, data, false)?;
        let num_items = i32::try_from(data.len()).unwrap_or(i32::MAX) / item_size.max(1);
        Ok(Self {
            kind,
            buffer: Some(buffer),
            item_size,
            num_items,
            shader_attribute,
        })
    }

    #[inline]
    #[must_use]
    pub fn buffer(&self) -> Option<BufferHandle> {
        self.buffer
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Components per vertex.
    #[inline]
    #[must_use]
    pub fn item_size(&self) -> i32 {
        self.item_size
    }

    /// Number of vertices (or indices).
    #[inline]
    #[must_use]
    pub fn num_items(&self) -> i32 {
        self.num_items
    }

    /// `false` for the index buffer.
    #[inline]
    #[must_use]
    pub fn is_shader_attribute(&self) -> bool {
        self.shader_attribute
    }

    pub fn bind(&self, ctx: &GpuContext) {
        ctx.gl().bind_buffer(self.kind.target(), self.buffer);
    }

    pub fn unbind(&self, ctx: &GpuContext) {
        ctx.gl().bind_buffer(self.kind.target(), None);
    }

    /// Overwrites the buffer content from offset 0.
    pub fn update(&self, ctx: &GpuContext, data: &[f32]) {
        if let Some(buffer) = self.buffer {
            ctx.update_buffer(buffer, self.kind, BufferSource::F32(data));
        }
    }

    pub fn dispose(&mut self, ctx: &GpuContext) {
        if let Some(buffer) = self.buffer.take() {
            ctx.gl().delete_buffer(buffer);
        }
    }
}

// ============================================================================
// Face
// ============================================================================

/// One indexed triangle with copies of its corner positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub indices: [u16; 3],
    pub vertices: [Vec3; 3],
    /// Indices into [`Geometry::uvs`], equal to `indices`.
    pub uvs: [u16; 3],
    pub normal: Vec3,
}

impl Face {
    #[must_use]
    pub fn new(indices: [u16; 3], vertices: [Vec3; 3]) -> Self {
        let mut face = Self {
            indices,
            vertices,
            uvs: indices,
            normal: Vec3::ZERO,
        };
        face.update_face_normal();
        face
    }

    pub fn update_face_normal(&mut self) {
        let [a, b, c] = self.vertices;
        self.normal = (b - a).cross(c - a).normalize_or_zero();
    }
}

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug)]
pub struct Geometry {
    data: GeometryData,
    attributes: Vec<(String, BufferAttribute)>,
    attributes_instanced: Vec<(String, BufferAttribute)>,
    vertices: Vec<Vec3>,
    faces: Vec<Face>,
    uvs: Vec<Vec2>,
}

impl Geometry {
    /// Validates `data` and uploads one buffer per present array.
    pub fn new(ctx: &GpuContext, data: GeometryData) -> Result<Self> {
        data.validate()?;

        let mut attributes = Vec::new();
        attributes.push((
            POSITION.to_string(),
            BufferAttribute::new(ctx, BufferKind::Vertex, BufferSource::F32(&data.vertices), 3, true)?,
        ));
        if let Some(indices) = &data.indices {
            attributes.push((
                INDEX.to_string(),
                BufferAttribute::new(ctx, BufferKind::Index, BufferSource::U16(indices), 1, false)?,
            ));
        }
        if let Some(normals) = &data.normals {
            attributes.push((
                NORMAL.to_string(),
                BufferAttribute::new(ctx, BufferKind::Vertex, BufferSource::F32(normals), 3, true)?,
            ));
        }
        if let Some(uvs) = &data.uvs {
            attributes.push((
                UV.to_string(),
                BufferAttribute::new(ctx, BufferKind::Vertex, BufferSource::F32(uvs), 2, true)?,
            ));
        }
        if let Some(colors) = &data.colors {
            attributes.push((
                COLOR.to_string(),
                BufferAttribute::new(ctx, BufferKind::Vertex, BufferSource::F32(colors), 3, true)?,
            ));
        }

        let mut geometry = Self {
            data,
            attributes,
            attributes_instanced: Vec::new(),
            vertices: Vec::new(),
            faces: Vec::new(),
            uvs: Vec::new(),
        };
        geometry.generate_vertices();
        geometry.generate_faces();
        geometry.generate_uvs();
        Ok(geometry)
    }

    /// Adds a per-instance attribute (divisor 1 once bound by a mesh).
    pub fn add_instanced_attribute(
        &mut self,
        ctx: &GpuContext,
        name: impl Into<String>,
        data: &[f32],
        item_size: i32,
    ) -> Result<()> {
        let attribute =
            BufferAttribute::new(ctx, BufferKind::Vertex, BufferSource::F32(data), item_size, true)?;
        self.attributes_instanced.push((name.into(), attribute));
        Ok(())
    }

    // ========================================================================
    // CPU records
    // ========================================================================

    pub fn generate_vertices(&mut self) {
        self.vertices = self
            .data
            .vertices
            .chunks_exact(3)
            .map(Vec3::from_slice)
            .collect();
    }

    /// One face per index triple. Needs [`generate_vertices`](Self::generate_vertices) first.
    pub fn generate_faces(&mut self) {
        let Some(indices) = &self.data.indices else {
            self.faces.clear();
            return;
        };
        let vertex = |i: u16| self.vertices.get(usize::from(i)).copied().unwrap_or(Vec3::ZERO);
        self.faces = indices
            .chunks_exact(3)
            .map(|tri| {
                let [a, b, c] = [tri[0], tri[1], tri[2]];
                Face::new([a, b, c], [vertex(a), vertex(b), vertex(c)])
            })
            .collect();
    }

    pub fn generate_uvs(&mut self) {
        self.uvs = self
            .data
            .uvs
            .as_deref()
            .unwrap_or_default()
            .chunks_exact(2)
            .map(Vec2::from_slice)
            .collect();
    }

    /// Writes [`vertices_mut`](Self::vertices_mut) edits back into the
    /// position buffer and refreshes the faces.
    pub fn update_vertices(&mut self, ctx: &GpuContext) {
        for (dst, vertex) in self.data.vertices.chunks_exact_mut(3).zip(&self.vertices) {
            dst.copy_from_slice(&vertex.to_array());
        }
        if let Some(attribute) = self.attribute(POSITION) {
            attribute.update(ctx, &self.data.vertices);
        }
        self.generate_faces();
    }

    /// Recomputes flat face normals and uploads them.
    ///
    /// A vertex shared by several faces takes the normal of the last one.
    pub fn update_normals(&mut self, ctx: &GpuContext) {
        if self.data.normals.is_none() {
            log::warn!("Geometry has no normal buffer to update");
            return;
        }

        let mut normals = vec![0.0; self.data.vertices.len()];
        for face in &mut self.faces {
            face.update_face_normal();
            for &index in &face.indices {
                let offset = usize::from(index) * 3;
                if let Some(dst) = normals.get_mut(offset..offset + 3) {
                    dst.copy_from_slice(&face.normal.to_array());
                }
            }
        }

        if let Some(attribute) = self.attribute(NORMAL) {
            attribute.update(ctx, &normals);
        }
        self.data.normals = Some(normals);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn data(&self) -> &GeometryData {
        &self.data
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&BufferAttribute> {
        self.attributes
            .iter()
            .find_map(|(n, attribute)| (n == name).then_some(attribute))
    }

    /// Attributes in creation order, index buffer included.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &BufferAttribute)> {
        self.attributes.iter().map(|(name, a)| (name.as_str(), a))
    }

    pub fn instanced_attributes(&self) -> impl Iterator<Item = (&str, &BufferAttribute)> {
        self.attributes_instanced.iter().map(|(name, a)| (name.as_str(), a))
    }

    #[must_use]
    pub fn index_buffer(&self) -> Option<&BufferAttribute> {
        self.attribute(INDEX)
    }

    /// Number of vertices in the position buffer.
    #[must_use]
    pub fn vertex_count(&self) -> i32 {
        self.attribute(POSITION).map_or(0, BufferAttribute::num_items)
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Edited vertices reach the GPU on [`update_vertices`](Self::update_vertices).
    pub fn vertices_mut(&mut self) -> &mut [Vec3] {
        &mut self.vertices
    }

    #[must_use]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    #[must_use]
    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    /// Shader defines implied by the present arrays.
    #[must_use]
    pub fn features(&self) -> ShaderFeatures {
        let mut features = ShaderFeatures::empty();
        features.set(ShaderFeatures::UV, self.data.uvs.is_some());
        features.set(ShaderFeatures::VERTEX_COLORS, self.data.colors.is_some());
        features.set(ShaderFeatures::NORMALS, self.data.normals.is_some());
        features
    }

    /// Largest distance of a vertex from the local origin.
    #[must_use]
    pub fn bounding_radius(&self) -> f32 {
        self.vertices.iter().map(|v| v.length()).fold(0.0, f32::max)
    }

    /// Deletes every buffer. The CPU records are dropped as well.
    pub fn dispose(&mut self, ctx: &GpuContext) {
        for (_, attribute) in self
            .attributes
            .iter_mut()
            .chain(self.attributes_instanced.iter_mut())
        {
            attribute.dispose(ctx);
        }
        self.attributes.clear();
        self.attributes_instanced.clear();
        self.vertices.clear();
        self.faces.clear();
        self.uvs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_out_of_range_index() {
        let data = GeometryData::new(vec![0.0; 9]).with_indices(vec![0, 1, 3]);
        assert!(matches!(data.validate(), Err(MediumError::InvalidGeometry(_))));
    }

    #[test]
    fn validate_rejects_short_normals() {
        let data = GeometryData::new(vec![0.0; 9]).with_normals(vec![0.0; 6]);
        assert!(data.validate().is_err());
        assert!(GeometryData::new(vec![0.0; 9]).with_uvs(vec![0.0; 6]).validate().is_ok());
    }

    #[test]
    fn face_normal_follows_winding() {
        let face = Face::new([0, 1, 2], [Vec3::ZERO, Vec3::X, Vec3::Y]);
        assert_eq!(face.normal, Vec3::Z);
    }
}
