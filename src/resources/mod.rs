//! Resources Module
//!
//! GPU-backed building blocks a [`Mesh`](crate::scene::Mesh) is made of:
//! - Geometry: vertex buffers and CPU face records
//! - Material: program, uniform map and draw state
//! - Texture: 2D, cube and 3D textures
//! - Uniforms: typed uniform values and the ordered uniform map
//! - Primitives: plane, sphere, line and helper geometries

pub mod geometry;
pub mod material;
pub mod primitives;
pub mod texture;
pub mod uniforms;

pub use geometry::{BufferAttribute, Face, Geometry, GeometryData};
pub use material::{Culling, Material, MaterialKind, MaterialOptions, SharedMaterial};
pub use texture::{
    TexelData, Texture, Texture3d, TextureCube, TextureImage, TextureOptions, TextureState,
    TextureVideo, VideoEvent, VideoOptions,
};
pub use uniforms::{Uniform, UniformMap, UniformType, UniformValue};
