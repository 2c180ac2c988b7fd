//! Stylesheet pipeline.
//!
//! Parses each stylesheet with lightningcss and reprints it - normalized
//! in development, minified in release. Parse errors are build-phase
//! failures: they halt the sequence before anything is fingerprinted.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

use crate::config::SiteConfig;
use crate::core::BuildMode;
use crate::logger::ProgressLine;
use crate::utils::path::{collect_files, logical_path};

/// Compile one stylesheet source.
pub fn compile_css(source: &str, minify: bool) -> Result<String> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default())
        .map_err(|e| anyhow!("CSS parse error: {e}"))?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify,
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("CSS print error: {e}"))?;
    Ok(result.code)
}

/// Compile every stylesheet under `assets/css/` into `output/css/`.
///
/// Returns the number of stylesheets written.
pub fn process_styles(
    config: &SiteConfig,
    mode: BuildMode,
    progress: Option<&ProgressLine>,
) -> Result<usize> {
    let source_root = config.build.assets.join("css");
    let minify = mode.minify && config.build.minify;
    let mut count = 0;

    for path in collect_files(&source_root) {
        if path.extension().and_then(|e| e.to_str()) != Some("css") {
            continue;
        }

        let rel = logical_path(&path, &source_root)
            .ok_or_else(|| anyhow!("stylesheet outside assets root: {}", path.display()))?;
        let dest = config.build.output.join("css").join(&rel);

        let source = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let compiled = compile_css(&source, minify)
            .with_context(|| format!("failed to compile {}", config.root_relative(&path).display()))?;

        write_output(&dest, compiled.as_bytes())?;
        count += 1;
        if let Some(p) = progress {
            p.inc("styles");
        }
    }

    Ok(count)
}

/// Write an output file, creating parent directories.
pub(super) fn write_output(dest: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, content).with_context(|| format!("failed to write {}", dest.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_css_passthrough() {
        let out = compile_css("body {\n  color: #ff0000;\n}", false).unwrap();
        assert!(out.contains("body"));
        assert!(out.contains("red") || out.contains("#ff0000") || out.contains("#f00"));
    }

    #[test]
    fn test_compile_css_minify() {
        let expanded = compile_css("body {  color: red;  }\n\n/* note */", false).unwrap();
        let minified = compile_css("body {  color: red;  }\n\n/* note */", true).unwrap();
        assert!(minified.len() < expanded.len());
        assert!(!minified.contains('\n'));
    }

    #[test]
    fn test_compile_css_invalid() {
        // Stray close-brace cannot start a rule
        assert!(compile_css("body { color: red; } }", true).is_err());
    }
}
