//! Shader Transpiler Tests
//!
//! Tests for:
//! - ES 3.00 → ES 1.00 rewriting of vertex and fragment stages
//! - Fragment output removal and `gl_FragColor` substitution
//! - `texture()` resolution against sampler declarations
//! - Generation 2 pass-through
//! - Hook marker substitution through `process_source`

use std::borrow::Cow;

use medium::renderer::backend::ShaderStage;
use medium::renderer::{Generation, Precision};
use medium::shader::{ShaderContext, ShaderFeatures, ShaderHooks, process_source, transpile};

const FRAGMENT_ES300: &str = "#version 300 es
precision highp float;
in vec2 vUv;
uniform sampler2D uMap;
uniform samplerCube uEnv;
out vec4 outgoingColor;

void main(void) {
    vec4 base = texture(uMap, vUv);
    vec4 env = texture(uEnv, vec3(vUv, 1.0));
    outgoingColor = base * env;
}
";

const VERTEX_ES300: &str = "#version 300 es
in vec3 aVertexPosition;
in vec2 aUv;
out vec2 vUv;

float scale(in float value) {
    return value * 2.0;
}

void main(void) {
    vUv = aUv;
    gl_Position = vec4(aVertexPosition * scale(1.0), 1.0);
}
";

// ============================================================================
// Fragment stage
// ============================================================================

#[test]
fn fragment_output_becomes_gl_frag_color() {
    let out = transpile(FRAGMENT_ES300, ShaderStage::Fragment, Generation::Gen1);

    assert_eq!(out.matches("outgoingColor").count(), 0);
    assert_eq!(out.matches("gl_FragColor = ").count(), 1);
    assert!(!out.contains("out vec4"));
}

#[test]
fn fragment_version_pragma_removed() {
    let out = transpile(FRAGMENT_ES300, ShaderStage::Fragment, Generation::Gen1);
    assert!(!out.contains("#version"));
    assert!(out.starts_with("precision highp float;"));
}

#[test]
fn fragment_inputs_become_varyings() {
    let out = transpile(FRAGMENT_ES300, ShaderStage::Fragment, Generation::Gen1);
    assert!(out.contains("varying vec2 vUv;"));
    assert!(!out.contains("\nin vec2"));
}

#[test]
fn texture_calls_follow_sampler_type() {
    let out = transpile(FRAGMENT_ES300, ShaderStage::Fragment, Generation::Gen1);
    assert!(out.contains("texture2D(uMap, vUv)"));
    assert!(out.contains("textureCube(uEnv, vec3(vUv, 1.0))"));
    assert!(!out.contains(" texture("));
}

#[test]
fn unresolved_sampler_defaults_to_2d() {
    let src = "uniform mediump float unused;\nvoid main(void) {\n    gl_FragColor = texture(uUnknown, vec2(0.0));\n}\n";
    let out = transpile(src, ShaderStage::Fragment, Generation::Gen1);
    assert!(out.contains("texture2D(uUnknown"));
}

#[test]
fn sampler_parameters_are_resolved() {
    let src = "vec4 sampleEnv(samplerCube env, vec3 dir) {\n    return texture(env, dir);\n}\n";
    let out = transpile(src, ShaderStage::Fragment, Generation::Gen1);
    assert!(out.contains("return textureCube(env, dir);"));
}

#[test]
fn texture_proj_renamed() {
    let src = "uniform sampler2D uShadow;\nvoid main(void) {\n    gl_FragColor = textureProj(uShadow, vec3(1.0));\n}\n";
    let out = transpile(src, ShaderStage::Fragment, Generation::Gen1);
    assert!(out.contains("texture2DProj(uShadow"));
}

#[test]
fn comments_are_left_alone() {
    let src = "// out vec4 outgoingColor is the es300 output\nvoid main(void) {}\n";
    let out = transpile(src, ShaderStage::Fragment, Generation::Gen1);
    assert!(out.contains("// out vec4 outgoingColor is the es300 output"));
}

// ============================================================================
// Vertex stage
// ============================================================================

#[test]
fn vertex_qualifiers_rewritten() {
    let out = transpile(VERTEX_ES300, ShaderStage::Vertex, Generation::Gen1);
    assert!(out.contains("attribute vec3 aVertexPosition;"));
    assert!(out.contains("attribute vec2 aUv;"));
    assert!(out.contains("varying vec2 vUv;"));
}

#[test]
fn vertex_parameter_qualifiers_survive() {
    let out = transpile(VERTEX_ES300, ShaderStage::Vertex, Generation::Gen1);
    assert!(out.contains("float scale(in float value)"));
}

#[test]
fn matching_is_case_sensitive() {
    let src = "In vec3 a;\nOUT vec3 b;\n";
    let out = transpile(src, ShaderStage::Vertex, Generation::Gen1);
    assert_eq!(out, src);
}

// ============================================================================
// Generation 2
// ============================================================================

#[test]
fn generation_two_is_byte_identical() {
    for (src, stage) in [
        (FRAGMENT_ES300, ShaderStage::Fragment),
        (VERTEX_ES300, ShaderStage::Vertex),
    ] {
        let out = transpile(src, stage, Generation::Gen2);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, src);
    }
}

// ============================================================================
// Hook substitution
// ============================================================================

fn shader_ctx(generation: Generation, hooks: &ShaderHooks) -> ShaderContext<'_> {
    ShaderContext {
        generation,
        precision: Precision::Mediump,
        features: ShaderFeatures::UV,
        hooks,
        directional_lights: None,
        point_lights: None,
    }
}

#[test]
fn hooks_are_spliced_before_transpiling() {
    let hooks = ShaderHooks::new().with_fragment_main("color.rgb *= 0.5;");
    let src = "#version 300 es\n#HOOK_PRECISION\n#HOOK_DEFINES\nout vec4 outgoingColor;\nvoid main(void) {\n    vec4 color = vec4(1.0);\n    #HOOK_FRAGMENT_MAIN\n    outgoingColor = color;\n}\n";

    let out = process_source(src, ShaderStage::Fragment, &shader_ctx(Generation::Gen1, &hooks));
    assert!(out.contains("precision mediump float;"));
    assert!(out.contains("#define uv"));
    assert!(out.contains("color.rgb *= 0.5;"));
    assert!(out.contains("gl_FragColor = color;"));
    assert!(!out.contains("#HOOK_"));
}

#[test]
fn empty_hooks_clear_markers() {
    let hooks = ShaderHooks::new();
    let src = "void main(void) {\n    #HOOK_VERTEX_PRE\n    #HOOK_VERTEX_MAIN\n    #HOOK_VERTEX_END\n}\n";
    let out = process_source(src, ShaderStage::Vertex, &shader_ctx(Generation::Gen2, &hooks));
    assert!(!out.contains("#HOOK_"));
}
