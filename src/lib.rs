#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod shader;
pub mod utils;

pub use errors::{MediumError, Result};
pub use renderer::backend::headless::{HeadlessBackend, HeadlessOptions};
pub use renderer::backend::{DrawMode, GpuBackend};
pub use renderer::{
    ContextPreference, ContextProvider, Generation, GpuContext, HeadlessProvider, RenderTarget,
    RenderTargetSettings, Renderer, RendererSettings,
};
pub use resources::primitives::*;
pub use resources::{
    Culling, Geometry, GeometryData, Material, MaterialKind, MaterialOptions, Texture, TextureCube,
    UniformValue,
};
pub use scene::{Camera, Light, LightKind, Lights, Mesh, Raycaster, Scene};
pub use shader::{ShaderHooks, transpile};
