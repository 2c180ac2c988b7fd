//! Script pipeline.
//!
//! Concatenates every script under `assets/js/` (sorted by path, so bundle
//! order is stable across platforms) into a single `js/main.js`, minified
//! in release mode via oxc.

use std::fs;

use anyhow::{Context, Result, anyhow};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::config::SiteConfig;
use crate::core::BuildMode;
use crate::logger::ProgressLine;
use crate::utils::path::collect_files;

/// Bundle filename inside `output/js/`.
pub const BUNDLE_NAME: &str = "main.js";

/// Minify JavaScript source code.
pub fn minify_js(source: &str) -> Result<String> {
    let allocator = Allocator::default();
    let source_type = SourceType::mjs();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if let Some(error) = ret.errors.first() {
        return Err(anyhow!("JS parse error: {error}"));
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(code)
}

/// Concatenate script sources in the given order.
pub fn concat_scripts(sources: &[String]) -> String {
    sources.join("\n")
}

/// Bundle every script under `assets/js/` into `output/js/main.js`.
///
/// Returns the number of source files bundled (0 writes no bundle).
pub fn process_scripts(
    config: &SiteConfig,
    mode: BuildMode,
    progress: Option<&ProgressLine>,
) -> Result<usize> {
    let source_root = config.build.assets.join("js");

    let mut sources = Vec::new();
    for path in collect_files(&source_root) {
        if path.extension().and_then(|e| e.to_str()) != Some("js") {
            continue;
        }
        let source = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        sources.push(source);
        if let Some(p) = progress {
            p.inc("scripts");
        }
    }

    if sources.is_empty() {
        return Ok(0);
    }

    let bundle = concat_scripts(&sources);
    let bundle = if mode.minify && config.build.minify {
        minify_js(&bundle).context("failed to minify script bundle")?
    } else {
        bundle
    };

    let dest = config.build.output.join("js").join(BUNDLE_NAME);
    super::styles::write_output(&dest, bundle.as_bytes())?;

    Ok(sources.len())
}
