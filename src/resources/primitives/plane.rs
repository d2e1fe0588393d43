use crate::resources::geometry::GeometryData;

/// Plane the quad grid lies in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaneAxis {
    /// Facing +Z.
    #[default]
    XY,
    /// Facing +Y.
    XZ,
    /// Facing +X.
    YZ,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneOptions {
    pub width: f32,
    pub height: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    pub axis: PlaneAxis,
}

impl Default for PlaneOptions {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            width_segments: 1,
            height_segments: 1,
            axis: PlaneAxis::XY,
        }
    }
}

/// Centered plane. Every cell owns its four corners, so neighbouring cells
/// do not share vertices.
#[must_use]
pub fn create_plane(options: PlaneOptions) -> GeometryData {
    let grid_x = options.width_segments.max(1);
    let grid_y = options.height_segments.max(1);

    let segment_width = options.width / grid_x as f32;
    let segment_height = options.height / grid_y as f32;
    let offset_x = -options.width * 0.5;
    let offset_y = -options.height * 0.5;
    let segment_u = 1.0 / grid_x as f32;
    let segment_v = 1.0 / grid_y as f32;

    let cells = (grid_x * grid_y) as usize;
    let mut positions = Vec::with_capacity(cells * 12);
    let mut normals = Vec::with_capacity(cells * 12);
    let mut uvs = Vec::with_capacity(cells * 8);
    let mut indices = Vec::with_capacity(cells * 6);

    let mut cell: u16 = 0;
    for iy in 0..grid_y {
        for ix in 0..grid_x {
            let x = segment_width * ix as f32 + offset_x;
            let y = segment_height * iy as f32 + offset_y;
            let u = ix as f32 / grid_x as f32;
            let v = iy as f32 / grid_y as f32;

            let (x1, y1) = (x + segment_width, y + segment_height);
            let (u1, v1) = (u + segment_u, v + segment_v);

            match options.axis {
                PlaneAxis::XZ => {
                    positions.extend_from_slice(&[x, 0.0, y, x1, 0.0, y, x1, 0.0, y1, x, 0.0, y1]);
                    normals.extend_from_slice(&[0.0, 1.0, 0.0].repeat(4));
                    uvs.extend_from_slice(&[u, 1.0 - v, u1, 1.0 - v, u1, 1.0 - v1, u, 1.0 - v1]);
                }
                PlaneAxis::YZ => {
                    positions.extend_from_slice(&[0.0, y, x, 0.0, y, x1, 0.0, y1, x1, 0.0, y1, x]);
                    normals.extend_from_slice(&[1.0, 0.0, 0.0].repeat(4));
                    uvs.extend_from_slice(&[1.0 - u, v, 1.0 - u1, v, 1.0 - u1, v1, 1.0 - u, v1]);
                }
                PlaneAxis::XY => {
                    positions.extend_from_slice(&[x, y, 0.0, x1, y, 0.0, x1, y1, 0.0, x, y1, 0.0]);
                    normals.extend_from_slice(&[0.0, 0.0, 1.0].repeat(4));
                    uvs.extend_from_slice(&[u, v, u1, v, u1, v1, u, v1]);
                }
            }

            let base = cell * 4;
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
            cell += 1;
        }
    }

    GeometryData::new(positions)
        .with_indices(indices)
        .with_normals(normals)
        .with_uvs(uvs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cell_plane() {
        let data = create_plane(PlaneOptions::default());
        assert_eq!(data.vertex_count(), 4);
        assert_eq!(data.indices.as_deref(), Some(&[0, 1, 2, 0, 2, 3][..]));
        assert_eq!(&data.vertices[..3], &[-0.5, -0.5, 0.0]);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn xz_plane_faces_up() {
        let data = create_plane(PlaneOptions {
            axis: PlaneAxis::XZ,
            width_segments: 2,
            height_segments: 3,
            ..PlaneOptions::default()
        });
        assert_eq!(data.vertex_count(), 24);
        assert_eq!(data.indices.as_ref().map(Vec::len), Some(36));
        let normals = data.normals.unwrap_or_default();
        assert!(normals.chunks(3).all(|n| n == [0.0, 1.0, 0.0]));
        assert!(data.vertices.chunks(3).all(|p| p[1] == 0.0));
    }
}
