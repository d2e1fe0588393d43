//! Ray picking against mesh triangles.

use std::cmp::Ordering;

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

use crate::resources::geometry::Face;
use crate::scene::camera::Camera;
use crate::scene::mesh::{Mesh, MeshId};

const EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    #[must_use]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Moves the center by `matrix` and scales the radius by its largest
    /// axis scale.
    #[must_use]
    pub fn apply_matrix(&self, matrix: Mat4) -> Self {
        let center = matrix.transform_point3(self.center);
        let max_scale = matrix
            .x_axis
            .xyz()
            .length_squared()
            .max(matrix.y_axis.xyz().length_squared())
            .max(matrix.z_axis.xyz().length_squared())
            .sqrt();
        Self::new(center, self.radius * max_scale)
    }

    #[inline]
    #[must_use]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.distance_squared(self.center) <= self.radius * self.radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::NEG_Z)
    }
}

impl Ray {
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    #[inline]
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance from `point` to the closest point of the ray. Points behind
    /// the origin measure against the origin.
    #[must_use]
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        let t = (point - self.origin).dot(self.direction);
        if t < 0.0 {
            return self.origin.distance(point);
        }
        self.at(t).distance(point)
    }

    #[must_use]
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.distance_to_point(sphere.center) <= sphere.radius
    }

    /// Möller-Trumbore. With `backface_culling`, triangles wound clockwise
    /// as seen from the origin are ignored.
    #[must_use]
    pub fn intersect_triangle(&self, a: Vec3, b: Vec3, c: Vec3, backface_culling: bool) -> Option<Vec3> {
        let edge1 = b - a;
        let edge2 = c - a;
        let normal = edge1.cross(edge2);

        let mut d_dot_n = self.direction.dot(normal);
        let sign = if d_dot_n > 0.0 {
            if backface_culling {
                return None;
            }
            1.0
        } else if d_dot_n < 0.0 {
            d_dot_n = -d_dot_n;
            -1.0
        } else {
            return None;
        };

        let diff = self.origin - a;
        let d_dot_q_x_e2 = sign * self.direction.dot(diff.cross(edge2));
        if d_dot_q_x_e2 < 0.0 {
            return None;
        }
        let d_dot_e1_x_q = sign * self.direction.dot(edge1.cross(diff));
        if d_dot_e1_x_q < 0.0 {
            return None;
        }
        if d_dot_q_x_e2 + d_dot_e1_x_q > d_dot_n {
            return None;
        }
        let q_dot_n = -sign * diff.dot(normal);
        if q_dot_n < 0.0 {
            return None;
        }
        Some(self.at(q_dot_n / d_dot_n))
    }

    #[must_use]
    pub fn apply_matrix(&self, matrix: Mat4) -> Self {
        let origin = matrix.transform_point3(self.origin);
        let direction = matrix.transform_vector3(self.direction);
        Self::new(origin, direction)
    }
}

/// A hit found by [`Raycaster::intersect_object`].
#[derive(Debug, Clone)]
pub struct Intersection {
    pub mesh: MeshId,
    /// World-space hit point.
    pub point: Vec3,
    pub distance: f32,
    /// Interpolated texture coordinate, when the geometry has UVs.
    pub uv: Option<Vec2>,
    pub face: Face,
    pub face_index: usize,
}

#[derive(Debug, Clone)]
pub struct Raycaster {
    pub ray: Ray,
    pub near: f32,
    pub far: f32,
    pub backface_culling: bool,
}

impl Default for Raycaster {
    fn default() -> Self {
        Self {
            ray: Ray::default(),
            near: 0.0,
            far: f32::INFINITY,
            backface_culling: true,
        }
    }
}

impl Raycaster {
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            ray: Ray::new(origin, direction),
            ..Self::default()
        }
    }

    /// Aims the ray through `coords`, given in normalized device
    /// coordinates (`-1..1` on both axes, y up).
    pub fn set_from_camera(&mut self, coords: Vec2, camera: &Camera) {
        let inverse = camera.view_projection_matrix().inverse();
        if camera.is_perspective() {
            let point = inverse.project_point3(coords.extend(0.5));
            self.ray = Ray::new(camera.position, point - camera.position);
        } else {
            let origin = inverse.project_point3(coords.extend(-1.0));
            self.ray = Ray::new(origin, camera.target - camera.position);
        }
    }

    /// Nearest hit on `mesh`, using its model matrix as of the last draw.
    #[must_use]
    pub fn intersect_object(&self, mesh: &Mesh) -> Option<Intersection> {
        if !mesh.visible || mesh.is_disposed() {
            return None;
        }
        let model = mesh.model_matrix();

        let sphere = mesh.bounding_sphere().apply_matrix(model);
        if !self.ray.intersects_sphere(&sphere) {
            return None;
        }

        let inverse = model.inverse();
        let local_ray = self.ray.apply_matrix(inverse);
        let geometry = mesh.geometry();
        let uvs = geometry.uvs();

        let mut nearest: Option<Intersection> = None;
        for (face_index, face) in geometry.faces().iter().enumerate() {
            let [a, b, c] = face.vertices;
            let Some(local_point) = local_ray.intersect_triangle(a, b, c, self.backface_culling) else {
                continue;
            };
            let point = model.transform_point3(local_point);
            let distance = self.ray.origin.distance(point);
            if distance < self.near || distance > self.far {
                continue;
            }
            if nearest.as_ref().is_some_and(|hit| hit.distance <= distance) {
                continue;
            }

            let uv = face_uv(face, local_point, uvs);
            nearest = Some(Intersection {
                mesh: mesh.id(),
                point,
                distance,
                uv,
                face: *face,
                face_index,
            });
        }
        nearest
    }

    /// Hits across `meshes`, nearest first.
    pub fn intersect_objects<'a>(&self, meshes: impl IntoIterator<Item = &'a Mesh>) -> Vec<Intersection> {
        let mut hits: Vec<Intersection> = meshes
            .into_iter()
            .filter_map(|mesh| self.intersect_object(mesh))
            .collect();
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        hits
    }
}

fn face_uv(face: &Face, point: Vec3, uvs: &[Vec2]) -> Option<Vec2> {
    let [ia, ib, ic] = face.uvs.map(usize::from);
    let (uv_a, uv_b, uv_c) = (uvs.get(ia)?, uvs.get(ib)?, uvs.get(ic)?);
    let weights = barycentric(point, face.vertices)?;
    Some(*uv_a * weights.x + *uv_b * weights.y + *uv_c * weights.z)
}

fn barycentric(point: Vec3, [a, b, c]: [Vec3; 3]) -> Option<Vec3> {
    let v0 = c - a;
    let v1 = b - a;
    let v2 = point - a;

    let dot00 = v0.dot(v0);
    let dot01 = v0.dot(v1);
    let dot02 = v0.dot(v2);
    let dot11 = v1.dot(v1);
    let dot12 = v1.dot(v2);

    let denom = dot00 * dot11 - dot01 * dot01;
    if denom.abs() < EPSILON {
        return None;
    }
    let inv = 1.0 / denom;
    let u = (dot11 * dot02 - dot01 * dot12) * inv;
    let v = (dot00 * dot12 - dot01 * dot02) * inv;
    Some(Vec3::new(1.0 - u - v, v, u))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_hits_front_face_only_when_culling() {
        let ray = Ray::new(Vec3::new(0.25, 0.25, 5.0), Vec3::NEG_Z);
        let (a, b, c) = (Vec3::ZERO, Vec3::X, Vec3::Y);

        let hit = ray.intersect_triangle(a, b, c, true).expect("front face");
        assert!((hit - Vec3::new(0.25, 0.25, 0.0)).length() < 1e-5);

        assert!(ray.intersect_triangle(a, c, b, true).is_none());
        assert!(ray.intersect_triangle(a, c, b, false).is_some());
    }

    #[test]
    fn ray_misses_outside_triangle() {
        let ray = Ray::new(Vec3::new(2.0, 2.0, 5.0), Vec3::NEG_Z);
        assert!(ray.intersect_triangle(Vec3::ZERO, Vec3::X, Vec3::Y, false).is_none());
    }

    #[test]
    fn sphere_scaled_by_largest_axis() {
        let sphere = BoundingSphere::new(Vec3::ZERO, 1.0);
        let m = Mat4::from_scale_rotation_translation(
            Vec3::new(1.0, 3.0, 2.0),
            glam::Quat::IDENTITY,
            Vec3::new(0.0, 0.0, -4.0),
        );
        let moved = sphere.apply_matrix(m);
        assert!((moved.radius - 3.0).abs() < 1e-5);
        assert!((moved.center - Vec3::new(0.0, 0.0, -4.0)).length() < 1e-5);
    }

    #[test]
    fn barycentric_weights_at_vertices() {
        let tri = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let w = barycentric(Vec3::X, tri).unwrap();
        assert!((w - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5);
        let w = barycentric(Vec3::Y, tri).unwrap();
        assert!((w - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-5);
    }
}
