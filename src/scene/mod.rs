//! Scene Module
//!
//! Everything a frame draws:
//! - [`Mesh`]: geometry + material and the per-draw protocol
//! - [`Scene`]: ordered mesh list plus the shared light aggregates
//! - [`Camera`]: look-at view with perspective or orthographic projection
//! - [`Light`] / [`Lights`]: packed light records and their aggregates
//! - [`Transform`]: model transform with dirty tracking
//! - [`Raycaster`]: picking against mesh triangles

pub mod camera;
pub mod light;
pub mod lights;
pub mod mesh;
pub mod raycaster;
pub mod scene;
pub mod transform;

pub use camera::{Camera, ProjectionType};
pub use light::{Light, LightKind};
pub use lights::{Lights, LightsHandle};
pub use mesh::{Mesh, MeshId};
pub use raycaster::{BoundingSphere, Intersection, Ray, Raycaster};
pub use scene::Scene;
pub use transform::Transform;
