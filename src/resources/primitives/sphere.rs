use std::f32::consts::PI;

use crate::resources::geometry::GeometryData;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereOptions {
    pub radius: f32,
    /// Latitude bands, pole to pole.
    pub axis_divisions: u32,
    /// Longitude slices around the Y axis.
    pub height_divisions: u32,
}

impl Default for SphereOptions {
    fn default() -> Self {
        Self {
            radius: 1.0,
            axis_divisions: 8,
            height_divisions: 8,
        }
    }
}

/// UV sphere centered at the origin.
#[must_use]
pub fn create_sphere(options: SphereOptions) -> GeometryData {
    let radius = options.radius;
    let bands = options.axis_divisions.max(2);
    let slices = options.height_divisions.max(3);

    let vertex_count = ((bands + 1) * (slices + 1)) as usize;
    let mut positions = Vec::with_capacity(vertex_count * 3);
    let mut normals = Vec::with_capacity(vertex_count * 3);
    let mut uvs = Vec::with_capacity(vertex_count * 2);

    for band in 0..=bands {
        let theta = band as f32 * PI / bands as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for slice in 0..=slices {
            let phi = slice as f32 * 2.0 * PI / slices as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();

            let x = cos_phi * sin_theta;
            let y = cos_theta;
            let z = sin_phi * sin_theta;

            normals.extend_from_slice(&[x, y, z]);
            uvs.push(1.0 - slice as f32 / slices as f32);
            uvs.push(1.0 - band as f32 / bands as f32);
            positions.extend_from_slice(&[radius * x, radius * y, radius * z]);
        }
    }

    let mut indices = Vec::with_capacity((bands * slices * 6) as usize);
    let stride = slices + 1;
    for band in 0..bands {
        for slice in 0..slices {
            let first = (band * stride + slice) as u16;
            let second = first + stride as u16;
            indices.extend_from_slice(&[first, second, first + 1, second, second + 1, first + 1]);
        }
    }

    GeometryData::new(positions)
        .with_indices(indices)
        .with_normals(normals)
        .with_uvs(uvs)
}
