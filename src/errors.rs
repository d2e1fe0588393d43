//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! [`MediumError`] covers configuration mistakes that the caller can act on:
//! - no usable GPU context
//! - material setups exceeding the context limits
//! - malformed geometry input
//! - shader template rendering failures
//!
//! GPU status failures (shader compile, program link) are deliberately absent.
//! They are logged and leave the affected [`Program`](crate::shader::Program)
//! in its non-created state so the rest of the scene keeps rendering.
//!
//! # Usage
//!
//! ```rust,ignore
//! use medium::errors::{MediumError, Result};
//!
//! fn build() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the crate.
#[derive(Error, Debug)]
pub enum MediumError {
    // ========================================================================
    // Context Errors
    // ========================================================================
    /// Neither API generation could be obtained from the host.
    #[error("No WebGL context available (requested {requested})")]
    ContextUnavailable {
        /// Name of the preferred context kind.
        requested: &'static str,
    },

    /// A generation-2 only resource was requested on a generation-1 context.
    #[error("{0} requires a WebGL2 context")]
    UnsupportedGeneration(&'static str),

    /// The driver refused to allocate a GPU object.
    #[error("Failed to create GPU resource: {0}")]
    ResourceCreation(&'static str),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A material declares more samplers than the context exposes units.
    #[error("Material uses {requested} texture units but the context supports {max}")]
    TextureUnitsExceeded {
        /// Number of sampler uniforms declared by the material.
        requested: usize,
        /// Capability-reported maximum.
        max: usize,
    },

    /// A uniform declaration used an unknown type tag.
    #[error("Unknown uniform type tag: {0:?}")]
    UnknownUniformType(String),

    /// A light aggregate was built from lights of different kinds.
    #[error("A Lights aggregate must contain lights of a single kind")]
    MixedLightKinds,

    /// A light aggregate was built without any light.
    #[error("A Lights aggregate needs at least one light")]
    EmptyLights,

    // ========================================================================
    // Geometry Errors
    // ========================================================================
    /// Geometry buffers are inconsistent.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// Template lookup or rendering failed.
    #[error("Shader template error: {0}")]
    ShaderTemplate(#[from] minijinja::Error),

    // ========================================================================
    // Platform-Specific Errors
    // ========================================================================
    /// WASM-specific error.
    #[cfg(target_arch = "wasm32")]
    #[error("WASM error: {0}")]
    Wasm(String),
}

#[cfg(target_arch = "wasm32")]
impl From<wasm_bindgen::JsValue> for MediumError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        MediumError::Wasm(format!("{value:?}"))
    }
}

/// Alias for `Result<T, MediumError>`.
pub type Result<T> = std::result::Result<T, MediumError>;
