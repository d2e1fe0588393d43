//! GLSL ES 3.00 → GLSL ES 1.00 transpiler
//!
//! Shaders are authored in the ES 3.00 dialect. When the active context is
//! generation 1 the source is rewritten with a fixed list of rules, applied
//! in order:
//!
//! 1. the `#version 300 es` line is removed;
//! 2. vertex stage: `in` → `attribute`, `out` → `varying`;
//! 3. fragment stage: `in` → `varying`, the `out vec4 outgoingColor;`
//!    declaration line is removed, `outgoingColor` → `gl_FragColor`,
//!    `textureProj` → `texture2DProj`;
//! 4. fragment stage: every `texture(` call is renamed to `texture2D(` or
//!    `textureCube(` depending on how its sampler argument is declared.
//!
//! Matching works on whole identifiers and skips comments. Storage
//! qualifiers are only rewritten at global scope, so `in` / `out` parameter
//! qualifiers of functions survive.
//!
//! On generation 2 the source is returned untouched.

use std::borrow::Cow;

use rustc_hash::FxHashMap;

use crate::renderer::backend::ShaderStage;
use crate::renderer::context::Generation;

/// Rewrites `source` for `generation`.
#[must_use]
pub fn transpile(source: &str, stage: ShaderStage, generation: Generation) -> Cow<'_, str> {
    match generation {
        Generation::Gen2 => Cow::Borrowed(source),
        Generation::Gen1 => Cow::Owned(to_es100(source, stage)),
    }
}

fn to_es100(source: &str, stage: ShaderStage) -> String {
    let stripped: String = source
        .lines()
        .filter(|line| !is_version_pragma(line))
        .filter(|line| stage == ShaderStage::Vertex || !is_fragment_output_decl(line))
        .map(|line| format!("{line}\n"))
        .collect();

    let tokens = tokenize(&stripped);
    let samplers = match stage {
        ShaderStage::Fragment => sampler_declarations(&tokens),
        ShaderStage::Vertex => FxHashMap::default(),
    };

    let mut out = String::with_capacity(stripped.len() + 64);
    let mut cursor = 0;
    for (i, token) in tokens.iter().enumerate() {
        let replacement = match stage {
            ShaderStage::Vertex => vertex_rule(token),
            ShaderStage::Fragment => fragment_rule(&stripped, &tokens, i, &samplers),
        };
        if let Some(replacement) = replacement {
            out.push_str(&stripped[cursor..token.start]);
            out.push_str(replacement);
            cursor = token.end;
        }
    }
    out.push_str(&stripped[cursor..]);
    out
}

fn is_version_pragma(line: &str) -> bool {
    line.trim_start().starts_with("#version 300 es")
}

fn is_fragment_output_decl(line: &str) -> bool {
    let code = line.split("//").next().unwrap_or_default();
    let words: Vec<&str> = code
        .split(|c: char| c.is_whitespace() || c == ';')
        .filter(|w| !w.is_empty())
        .collect();
    words == ["out", "vec4", "outgoingColor"] && code.contains(';')
}

fn vertex_rule(token: &Token<'_>) -> Option<&'static str> {
    match token.text {
        "in" if token.global => Some("attribute"),
        "out" if token.global => Some("varying"),
        _ => None,
    }
}

fn fragment_rule(
    source: &str,
    tokens: &[Token<'_>],
    index: usize,
    samplers: &FxHashMap<&str, SamplerKind>,
) -> Option<&'static str> {
    let token = &tokens[index];
    match token.text {
        "in" if token.global => Some("varying"),
        "outgoingColor" => Some("gl_FragColor"),
        "textureProj" => Some("texture2DProj"),
        "texture" if is_call(source, token) => {
            Some(resolve_texture_call(source, tokens, index, samplers))
        }
        _ => None,
    }
}

// ============================================================================
// Texture call resolution
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SamplerKind {
    Sampler2d,
    SamplerCube,
}

/// Maps every identifier declared as `sampler2D <name>` or
/// `samplerCube <name>` (uniforms and function parameters alike).
fn sampler_declarations<'a>(tokens: &[Token<'a>]) -> FxHashMap<&'a str, SamplerKind> {
    let mut samplers = FxHashMap::default();
    for pair in tokens.windows(2) {
        let kind = match pair[0].text {
            "sampler2D" => SamplerKind::Sampler2d,
            "samplerCube" => SamplerKind::SamplerCube,
            _ => continue,
        };
        samplers.insert(pair[1].text, kind);
    }
    samplers
}

fn resolve_texture_call(
    source: &str,
    tokens: &[Token<'_>],
    index: usize,
    samplers: &FxHashMap<&str, SamplerKind>,
) -> &'static str {
    let argument = tokens.get(index + 1).map(|t| t.text);
    match argument.and_then(|name| samplers.get(name)) {
        Some(SamplerKind::Sampler2d) => "texture2D",
        Some(SamplerKind::SamplerCube) => "textureCube",
        None => {
            let line = line_of(source, tokens[index].start);
            log::warn!(
                "Cannot resolve the sampler type of texture({}) at line {line}, assuming sampler2D",
                argument.unwrap_or("?")
            );
            "texture2D"
        }
    }
}

/// 1-based line of byte `offset`.
fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].bytes().filter(|&b| b == b'\n').count() + 1
}

fn is_call(source: &str, token: &Token<'_>) -> bool {
    source[token.end..].trim_start().starts_with('(')
}

// ============================================================================
// Tokenizer
// ============================================================================

/// An identifier occurrence outside comments.
#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    text: &'a str,
    start: usize,
    end: usize,
    /// Not nested in any brace or parenthesis.
    global: bool,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn tokenize(source: &str) -> Vec<Token<'_>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut depth: usize = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i += 2;
            }
            b'{' | b'(' | b'[' => {
                depth += 1;
                i += 1;
            }
            b'}' | b')' | b']' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            _ if is_ident_start(b) => {
                let start = i;
                while i < bytes.len() && is_ident_continue(bytes[i]) {
                    i += 1;
                }
                tokens.push(Token {
                    text: &source[start..i],
                    start,
                    end: i,
                    global: depth == 0,
                });
            }
            _ if b.is_ascii_digit() => {
                // Skip numeric literals so suffixes never read as identifiers.
                while i < bytes.len() && (is_ident_continue(bytes[i]) || bytes[i] == b'.') {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<&str> {
        tokenize(source).iter().map(|t| t.text).collect()
    }

    #[test]
    fn tokenizer_skips_comments_and_numbers() {
        let src = "vec3 a = 1.0e5; // in out\n/* texture( */ float b;";
        assert_eq!(texts(src), ["vec3", "a", "float", "b"]);
    }

    #[test]
    fn tokenizer_tracks_scope() {
        let tokens = tokenize("in vec3 a; void f(in vec3 b) { out = 1; }");
        let scoped: Vec<_> = tokens.iter().map(|t| (t.text, t.global)).collect();
        assert_eq!(scoped[0], ("in", true));
        assert!(scoped.contains(&("b", false)));
        assert!(scoped.contains(&("out", false)));
    }

    #[test]
    fn output_decl_detection_is_whitespace_tolerant() {
        assert!(is_fragment_output_decl("  out vec4 outgoingColor;"));
        assert!(is_fragment_output_decl("out  vec4  outgoingColor ; // color"));
        assert!(!is_fragment_output_decl("outgoingColor = vec4(1.0);"));
        assert!(!is_fragment_output_decl("out vec4 fragData;"));
    }

    #[test]
    fn line_numbers_are_one_based() {
        let src = "texture(a, uv);\nvec4 c;\ntexture(b, uv);";
        assert_eq!(line_of(src, 0), 1);
        assert_eq!(line_of(src, src.rfind("texture").unwrap_or(0)), 3);
        assert_eq!(line_of(src, src.find("vec4").unwrap_or(0)), 2);
    }

    #[test]
    fn words_inside_identifiers_are_untouched() {
        let out = to_es100("in vec3 input_in;\nout vec3 outline;\n", ShaderStage::Vertex);
        assert_eq!(out, "attribute vec3 input_in;\nvarying vec3 outline;\n");
    }
}
