//! Shader Templates
//!
//! The built-in GLSL sources live in `src/shader/glsl` and are embedded with
//! `rust-embed`. They are minijinja templates (`{$ $}` blocks, `$$` line
//! statements) rendered once per generation: the ES 3.00 variant declares
//! uniform blocks and `in`/`out` varyings, the ES 1.00 variant plain uniforms
//! and `attribute`/`varying`.
//!
//! Rendering leaves every `#HOOK_*` marker in place; materials substitute
//! them afterwards.
//!
//! Chunks under `glsl/chunks` are also exposed through [`chunk`] so hook
//! authors can splice them into their own code.

use std::borrow::Cow;
use std::sync::OnceLock;

use minijinja::{Environment, Error, ErrorKind, syntax::SyntaxConfig};
use rust_embed::RustEmbed;
use serde::Serialize;

use crate::errors::Result;
use crate::renderer::context::Generation;

static SHADER_ENV: OnceLock<Environment<'static>> = OnceLock::new();

#[derive(RustEmbed)]
#[folder = "src/shader/glsl"]
struct ShaderAssets;

/// Per-generation spellings used by the templates.
#[derive(Debug, Clone, Serialize)]
struct TemplateContext {
    es300: bool,
    attribute: &'static str,
    varying_out: &'static str,
    varying_in: &'static str,
    frag_color: &'static str,
    projection: &'static str,
    swizzle1: &'static str,
    swizzle3: &'static str,
}

impl TemplateContext {
    fn for_generation(generation: Generation) -> Self {
        match generation {
            Generation::Gen2 => Self {
                es300: true,
                attribute: "in",
                varying_out: "out",
                varying_in: "in",
                frag_color: "outgoingColor",
                projection: "uProjectionView.projectionMatrix",
                swizzle1: ".x",
                swizzle3: ".xyz",
            },
            Generation::Gen1 => Self {
                es300: false,
                attribute: "attribute",
                varying_out: "varying",
                varying_in: "varying",
                frag_color: "gl_FragColor",
                projection: "uProjectionMatrix",
                swizzle1: "",
                swizzle3: "",
            },
        }
    }
}

fn get_env() -> &'static Environment<'static> {
    SHADER_ENV.get_or_init(|| {
        let mut env = Environment::new();

        match SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .line_statement_prefix("$$")
            .build()
        {
            Ok(syntax) => env.set_syntax(syntax),
            Err(e) => log::error!("Failed to configure shader template syntax: {e}"),
        }

        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);

        env.set_loader(shader_loader);

        env.set_path_join_callback(|name, _parent| format!("chunks/{name}").into());

        env
    })
}

fn shader_loader(name: &str) -> std::result::Result<Option<String>, Error> {
    let filename = if std::path::Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("glsl"))
    {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.glsl"))
    };

    match ShaderAssets::get(&filename) {
        Some(file) => std::str::from_utf8(file.data.as_ref())
            .map(|source| Some(source.to_string()))
            .map_err(|e| Error::new(ErrorKind::TemplateNotFound, format!("{filename}: {e}"))),
        None => Ok(None),
    }
}

/// Renders the template `name` (e.g. `"phong"`) for `generation`.
pub fn render(name: &str, generation: Generation) -> Result<String> {
    let template = get_env().get_template(name)?;
    let source = template.render(TemplateContext::for_generation(generation))?;
    Ok(source)
}

/// Renders the snippet chunk `name` (e.g. `"fog"`) for `generation`.
pub fn chunk(name: &str, generation: Generation) -> Result<String> {
    render(&format!("chunks/{name}"), generation)
}

/// Names of the embedded snippet chunks.
pub fn chunk_names() -> impl Iterator<Item = String> {
    ShaderAssets::iter().filter_map(|path| {
        path.strip_prefix("chunks/")
            .and_then(|file| file.strip_suffix(".glsl"))
            .map(str::to_string)
    })
}
