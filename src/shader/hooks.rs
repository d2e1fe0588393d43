//! Shader hook points and marker substitution.
//!
//! Templates carry `#HOOK_*` markers at fixed points. Before compilation a
//! material replaces them with:
//!
//! - `#HOOK_PRECISION`: the float precision statement of the context
//! - `#HOOK_DEFINES`: one `#define` per [`ShaderFeatures`] flag
//! - `#HOOK_VERTEX_*` / `#HOOK_FRAGMENT_*`: caller code from [`ShaderHooks`]
//! - `#HOOK_POINT_LIGHTS` / `#HOOK_DIRECTIONAL_LIGHTS`: light counts, only
//!   when the matching aggregate is attached
//!
//! The result then goes through the transpiler, so hook code is written in
//! the ES 3.00 dialect like the templates.

use bitflags::bitflags;

use crate::renderer::backend::ShaderStage;
use crate::renderer::capabilities::Precision;
use crate::renderer::context::Generation;
use crate::shader::transpile::transpile;

/// Caller supplied code spliced into the templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderHooks {
    /// Global scope of the vertex shader, before `main`.
    pub vertex_pre: String,
    /// Inside vertex `main`, before the position is written. May add to
    /// `transformed`.
    pub vertex_main: String,
    /// Last statements of vertex `main`.
    pub vertex_end: String,
    pub fragment_pre: String,
    /// Inside fragment `main`, before lighting. May modify `color`.
    pub fragment_main: String,
    pub fragment_end: String,
}

impl ShaderHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_vertex_pre(mut self, code: impl Into<String>) -> Self {
        self.vertex_pre = code.into();
        self
    }

    #[must_use]
    pub fn with_vertex_main(mut self, code: impl Into<String>) -> Self {
        self.vertex_main = code.into();
        self
    }

    #[must_use]
    pub fn with_vertex_end(mut self, code: impl Into<String>) -> Self {
        self.vertex_end = code.into();
        self
    }

    #[must_use]
    pub fn with_fragment_pre(mut self, code: impl Into<String>) -> Self {
        self.fragment_pre = code.into();
        self
    }

    #[must_use]
    pub fn with_fragment_main(mut self, code: impl Into<String>) -> Self {
        self.fragment_main = code.into();
        self
    }

    #[must_use]
    pub fn with_fragment_end(mut self, code: impl Into<String>) -> Self {
        self.fragment_end = code.into();
        self
    }

    fn markers(&self) -> [(&'static str, &str); 6] {
        [
            ("#HOOK_VERTEX_PRE", &self.vertex_pre),
            ("#HOOK_VERTEX_MAIN", &self.vertex_main),
            ("#HOOK_VERTEX_END", &self.vertex_end),
            ("#HOOK_FRAGMENT_PRE", &self.fragment_pre),
            ("#HOOK_FRAGMENT_MAIN", &self.fragment_main),
            ("#HOOK_FRAGMENT_END", &self.fragment_end),
        ]
    }
}

bitflags! {
    /// Optional template features, each emitted as a `#define`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderFeatures: u32 {
        const UV = 1 << 0;
        const VERTEX_COLORS = 1 << 1;
        const NORMALS = 1 << 2;
        const AMBIENT_LIGHT = 1 << 3;
        const DIRECTIONAL_LIGHTS = 1 << 4;
        const POINT_LIGHTS = 1 << 5;
    }
}

impl ShaderFeatures {
    const DEFINES: [(ShaderFeatures, &'static str); 6] = [
        (Self::UV, "uv"),
        (Self::VERTEX_COLORS, "vertexColors"),
        (Self::NORMALS, "normals"),
        (Self::AMBIENT_LIGHT, "ambientLight"),
        (Self::DIRECTIONAL_LIGHTS, "directionalLights"),
        (Self::POINT_LIGHTS, "pointLights"),
    ];

    /// The `#define` block for the set flags, one per line.
    #[must_use]
    pub fn defines(self) -> String {
        Self::DEFINES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| format!("#define {name}\n"))
            .collect()
    }
}

/// Everything needed to turn a template into compilable source.
#[derive(Debug, Clone, Copy)]
pub struct ShaderContext<'a> {
    pub generation: Generation,
    pub precision: Precision,
    pub features: ShaderFeatures,
    pub hooks: &'a ShaderHooks,
    /// Length of the attached directional light aggregate.
    pub directional_lights: Option<usize>,
    /// Length of the attached point light aggregate.
    pub point_lights: Option<usize>,
}

/// Substitutes every marker in `source`, then transpiles for generation 1.
#[must_use]
pub fn process_source(source: &str, stage: ShaderStage, ctx: &ShaderContext<'_>) -> String {
    let mut shader = source.replace(
        "#HOOK_PRECISION",
        &format!("precision {} float;", ctx.precision.keyword()),
    );
    shader = shader.replace("#HOOK_DEFINES", &ctx.features.defines());

    for (marker, code) in ctx.hooks.markers() {
        shader = shader.replace(marker, code);
    }

    if let Some(count) = ctx.point_lights {
        shader = shader.replace("#HOOK_POINT_LIGHTS", &count.to_string());
    }
    if let Some(count) = ctx.directional_lights {
        shader = shader.replace("#HOOK_DIRECTIONAL_LIGHTS", &count.to_string());
    }

    transpile(&shader, stage, ctx.generation).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defines_follow_flag_order() {
        let features = ShaderFeatures::NORMALS | ShaderFeatures::UV;
        assert_eq!(features.defines(), "#define uv\n#define normals\n");
        assert_eq!(ShaderFeatures::empty().defines(), "");
    }

    #[test]
    fn light_counts_are_left_alone_without_lights() {
        let hooks = ShaderHooks::new();
        let ctx = ShaderContext {
            generation: Generation::Gen2,
            precision: Precision::Mediump,
            features: ShaderFeatures::empty(),
            hooks: &hooks,
            directional_lights: None,
            point_lights: Some(3),
        };
        let out = process_source(
            "#HOOK_PRECISION\nPointLight p[#HOOK_POINT_LIGHTS];\nint d = #HOOK_DIRECTIONAL_LIGHTS;",
            ShaderStage::Fragment,
            &ctx,
        );
        assert!(out.starts_with("precision mediump float;"));
        assert!(out.contains("p[3]"));
        assert!(out.contains("#HOOK_DIRECTIONAL_LIGHTS"));
    }
}
