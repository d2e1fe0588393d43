//! Shader pipeline: embedded templates, hook substitution, the ES 3.00 →
//! ES 1.00 transpiler and the [`Program`] wrapper.

pub mod hooks;
pub mod program;
pub mod templates;
pub mod transpile;

pub use hooks::{ShaderContext, ShaderFeatures, ShaderHooks, process_source};
pub use program::Program;
pub use templates::{chunk, chunk_names};
pub use transpile::transpile;
