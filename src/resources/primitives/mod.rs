pub mod helpers;
pub mod plane;
pub mod sphere;

pub use helpers::{
    CameraHelper, axis_helper, create_axis, create_camera_frustum, create_grid, create_line,
    create_normals, grid_helper, normals_helper, vertices_helper,
};
pub use plane::{PlaneAxis, PlaneOptions, create_plane};
pub use sphere::{SphereOptions, create_sphere};
