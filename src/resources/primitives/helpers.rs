//! Line-list geometries and the debug helper meshes built on them.
//!
//! Helpers are ordinary [`Mesh`]es with a [`MaterialKind::Helper`] material:
//! grid, axis, per-vertex normals, vertex points and a camera frustum.

use glam::Vec3;

use crate::errors::{MediumError, Result};
use crate::renderer::backend::DrawMode;
use crate::renderer::context::GpuContext;
use crate::resources::geometry::{Geometry, GeometryData};
use crate::resources::material::{Material, MaterialKind, MaterialOptions};
use crate::resources::uniforms::UniformValue;
use crate::scene::camera::Camera;
use crate::scene::mesh::Mesh;
use crate::shader::ShaderHooks;
use crate::utils::lerp;

/// Segment list joining consecutive `points`: `n` points give `n - 1`
/// segments, each stored as its two endpoints for [`DrawMode::Lines`].
#[must_use]
pub fn create_line(points: &[Vec3]) -> GeometryData {
    let mut vertices = Vec::with_capacity(points.len().saturating_sub(1) * 6);
    for pair in points.windows(2) {
        vertices.extend_from_slice(&pair[0].to_array());
        vertices.extend_from_slice(&pair[1].to_array());
    }
    GeometryData::new(vertices)
}

/// Square grid on the XZ plane, `divisions + 1` lines along each axis.
#[must_use]
pub fn create_grid(size: f32, divisions: u32) -> GeometryData {
    let divisions = divisions.max(1);
    let half = size * 0.5;
    let mut vertices = Vec::with_capacity((divisions as usize + 1) * 12);

    for i in 0..=divisions {
        let t = lerp(-half, half, i as f32 / divisions as f32);
        vertices.extend_from_slice(&[t, 0.0, -half, t, 0.0, half]);
    }
    for i in 0..=divisions {
        let t = lerp(-half, half, i as f32 / divisions as f32);
        vertices.extend_from_slice(&[-half, 0.0, t, half, 0.0, t]);
    }
    GeometryData::new(vertices)
}

/// Three colored segments from the origin: X red, Y green, Z blue.
#[must_use]
pub fn create_axis(size: f32) -> GeometryData {
    #[rustfmt::skip]
    let vertices = vec![
        0.0, 0.0, 0.0, size, 0.0, 0.0,
        0.0, 0.0, 0.0, 0.0, size, 0.0,
        0.0, 0.0, 0.0, 0.0, 0.0, size,
    ];
    #[rustfmt::skip]
    let colors = vec![
        1.0, 0.0, 0.0, 1.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 1.0, 0.0, 0.0, 1.0,
    ];
    GeometryData::new(vertices).with_colors(colors)
}

/// One segment per vertex, from the vertex along its normal.
///
/// Vertices are scaled by `scale` so the segments keep `size` in world units
/// once the owning mesh's scale is applied. Fails when `data` has no normals.
pub fn create_normals(data: &GeometryData, size: f32, scale: Vec3) -> Result<GeometryData> {
    let normals = data.normals.as_ref().ok_or_else(|| {
        MediumError::InvalidGeometry("normals helper needs vertex normals".to_string())
    })?;

    let mut vertices = Vec::with_capacity(normals.len() * 2);
    for (vertex, normal) in data.vertices.chunks_exact(3).zip(normals.chunks_exact(3)) {
        let start = Vec3::from_slice(vertex) * scale;
        let end = start + Vec3::from_slice(normal) * size;
        vertices.extend_from_slice(&start.to_array());
        vertices.extend_from_slice(&end.to_array());
    }
    Ok(GeometryData::new(vertices))
}

/// Frustum outline pointing down `-Z`: near and far rectangles plus the four
/// edges joining their corners.
#[must_use]
pub fn create_camera_frustum() -> GeometryData {
    const DEPTH: f32 = 3.5;
    const NEAR: f32 = 0.5;
    const FAR: f32 = 3.0;
    const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (-1.0, 1.0), (1.0, 1.0), (1.0, -1.0)];

    let mut vertices = Vec::with_capacity(24 * 3);
    for (scale, z) in [(NEAR, 0.0), (FAR, -DEPTH)] {
        for i in 0..4 {
            let (x0, y0) = CORNERS[i];
            let (x1, y1) = CORNERS[(i + 1) % 4];
            vertices.extend_from_slice(&[x0 * scale, y0 * scale, z, x1 * scale, y1 * scale, z]);
        }
    }
    for (x, y) in CORNERS {
        vertices.extend_from_slice(&[x * NEAR, y * NEAR, 0.0, x * FAR, y * FAR, -DEPTH]);
    }
    GeometryData::new(vertices)
}

fn helper_options(name: &str, draw_mode: DrawMode) -> MaterialOptions {
    MaterialOptions {
        name: name.to_string(),
        kind: MaterialKind::Helper,
        draw_mode,
        ..MaterialOptions::default()
    }
}

fn helper_mesh(ctx: &GpuContext, data: GeometryData, options: MaterialOptions) -> Result<Mesh> {
    let geometry = Geometry::new(ctx, data)?;
    let name = options.name.clone();
    let mut mesh = Mesh::new(ctx, geometry, Material::shared(ctx, options)?)?;
    mesh.name = name;
    Ok(mesh)
}

/// Grey grid mesh drawn as lines.
pub fn grid_helper(ctx: &GpuContext, size: f32, divisions: u32) -> Result<Mesh> {
    helper_mesh(
        ctx,
        create_grid(size, divisions),
        helper_options("GridHelper", DrawMode::Lines),
    )
}

/// RGB axis mesh drawn as lines.
pub fn axis_helper(ctx: &GpuContext, size: f32) -> Result<Mesh> {
    helper_mesh(ctx, create_axis(size), helper_options("AxisHelper", DrawMode::Lines))
}

/// White normal segments of `mesh`, in its local space.
///
/// The helper copies the vertices once; give it the same transform as
/// `mesh` (minus the scale) to keep it attached.
pub fn normals_helper(ctx: &GpuContext, mesh: &Mesh, size: f32) -> Result<Mesh> {
    let data = create_normals(mesh.geometry().data(), size, mesh.transform.scale)?;
    let options = helper_options("NormalsHelper", DrawMode::Lines)
        .with_hooks(ShaderHooks::new().with_fragment_main("color = vec3(1.0);"));
    let mut helper = helper_mesh(ctx, data, options)?;
    helper.transform.position = mesh.transform.position;
    helper.transform.rotation = mesh.transform.rotation;
    Ok(helper)
}

/// Round points of `color` on every vertex of `mesh`, `size` scaled by the
/// inverse view distance.
pub fn vertices_helper(ctx: &GpuContext, mesh: &Mesh, size: f32, color: Vec3) -> Result<Mesh> {
    let data = GeometryData::new(mesh.geometry().data().vertices.clone());
    let hooks = ShaderHooks::new()
        .with_vertex_pre("uniform float uSize;")
        .with_vertex_end("gl_PointSize = uSize * (100.0 / length(gl_Position.xyz));")
        .with_fragment_pre("uniform vec3 uColor;")
        .with_fragment_main(
            "if (length(gl_PointCoord - 0.5) > 0.5) {\n\t\tdiscard;\n\t}\n\tcolor = uColor;",
        );
    let options = helper_options("VerticesHelper", DrawMode::Points)
        .with_hooks(hooks)
        .with_uniform("uSize", UniformValue::Float(size))
        .with_uniform("uColor", UniformValue::Vec3(color));
    let mut helper = helper_mesh(ctx, data, options)?;
    helper.transform = mesh.transform.clone();
    helper.transform.mark_dirty();
    Ok(helper)
}

/// Yellow frustum outline that follows a camera.
#[derive(Debug)]
pub struct CameraHelper {
    pub mesh: Mesh,
}

impl CameraHelper {
    pub fn new(ctx: &GpuContext, camera: &Camera) -> Result<Self> {
        let options = helper_options("CameraHelper", DrawMode::Lines)
            .with_hooks(ShaderHooks::new().with_fragment_main("color = vec3(1.0, 1.0, 0.0);"));
        let mut helper = Self {
            mesh: helper_mesh(ctx, create_camera_frustum(), options)?,
        };
        helper.update(camera);
        Ok(helper)
    }

    /// Moves the outline to `camera` and aims it at the camera target.
    pub fn update(&mut self, camera: &Camera) {
        let transform = &mut self.mesh.transform;
        transform.position = camera.position;
        transform.look_at(camera.target, camera.up);
        transform.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_pairs_consecutive_points() {
        let data = create_line(&[Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0)]);
        assert_eq!(data.vertex_count(), 4);
        assert_eq!(&data.vertices[3..9], &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn line_from_single_point_is_empty() {
        assert!(create_line(&[Vec3::ONE]).vertices.is_empty());
    }

    #[test]
    fn grid_spans_size() {
        let data = create_grid(10.0, 10);
        assert_eq!(data.vertex_count(), 44);
        let max = data.vertices.iter().copied().fold(f32::MIN, f32::max);
        assert!((max - 5.0).abs() < 1e-5);
    }

    #[test]
    fn axis_has_colors() {
        let data = create_axis(2.0);
        assert_eq!(data.vertex_count(), 6);
        assert_eq!(data.colors.as_ref().map(Vec::len), Some(18));
    }

    #[test]
    fn normals_start_on_scaled_vertices() {
        let data = GeometryData::new(vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
            .with_normals(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        let normals = create_normals(&data, 0.5, Vec3::splat(2.0)).expect("normals");
        assert_eq!(normals.vertex_count(), 4);
        assert_eq!(&normals.vertices[..6], &[2.0, 0.0, 0.0, 2.0, 0.0, 0.5]);
    }

    #[test]
    fn normals_need_normals() {
        let data = GeometryData::new(vec![0.0; 3]);
        assert!(matches!(
            create_normals(&data, 1.0, Vec3::ONE),
            Err(MediumError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn frustum_has_twelve_edges() {
        let data = create_camera_frustum();
        assert_eq!(data.vertex_count(), 24);
        let far = data.vertices.chunks_exact(3).filter(|v| v[2] < -3.0).count();
        assert_eq!(far, 12);
    }
}
