use glam::{Mat4, Vec3};

/// Aspect ratio of the default 1280x720 drawing buffer.
pub const DEFAULT_ASPECT: f32 = 1280.0 / 720.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionType {
    Perspective,
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
    },
}

/// A look-at camera.
///
/// The view matrix is rebuilt from `position`, `target` and `up` by
/// [`update_matrix_world`](Self::update_matrix_world); the projection by
/// [`update_projection_matrix`](Self::update_projection_matrix). Both use the
/// WebGL clip space (depth in `-1..1`).
#[derive(Debug, Clone)]
pub struct Camera {
    pub projection_type: ProjectionType,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,

    pub(crate) world_inverse_matrix: Mat4,
    pub(crate) projection_matrix: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new_perspective(70.0, DEFAULT_ASPECT, 0.1, 100.0)
    }
}

impl Camera {
    /// `fov` is in degrees.
    #[must_use]
    pub fn new_perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut cam = Self {
            projection_type: ProjectionType::Perspective,
            fov,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            up: Vec3::Y,
            world_inverse_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
        };
        cam.update_projection_matrix();
        cam
    }

    #[must_use]
    pub fn new_orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let mut cam = Self {
            projection_type: ProjectionType::Orthographic {
                left,
                right,
                bottom,
                top,
            },
            ..Self::new_perspective(70.0, DEFAULT_ASPECT, near, far)
        };
        cam.update_projection_matrix();
        cam
    }

    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_perspective(&self) -> bool {
        matches!(self.projection_type, ProjectionType::Perspective)
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Rebuilds the view matrix.
    pub fn update_matrix_world(&mut self) {
        self.world_inverse_matrix = Mat4::look_at_rh(self.position, self.target, self.up);
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection_matrix = match self.projection_type {
            ProjectionType::Perspective => {
                Mat4::perspective_rh_gl(self.fov.to_radians(), self.aspect, self.near, self.far)
            }
            ProjectionType::Orthographic {
                left,
                right,
                bottom,
                top,
            } => Mat4::orthographic_rh_gl(left, right, bottom, top, self.near, self.far),
        };
    }

    /// View matrix as of the last [`update_matrix_world`](Self::update_matrix_world).
    #[inline]
    #[must_use]
    pub fn world_inverse_matrix(&self) -> Mat4 {
        self.world_inverse_matrix
    }

    #[inline]
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    #[inline]
    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.world_inverse_matrix
    }
}
