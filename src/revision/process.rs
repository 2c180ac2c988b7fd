//! Revision phase: fingerprint built assets into the static directory.
//!
//! Walks the asset classes produced by the build pipelines inside the
//! output directory, writes a content-addressed copy of each file under
//! `<output>/<static_dir>/`, and records the logical -> fingerprinted pair
//! in the manifest. Stylesheets are processed in a second pass so rooted
//! and relative `url(...)` references can be rewritten through the
//! already-recorded entries before the stylesheet itself is fingerprinted.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use regex::Regex;

use crate::log;
use crate::logger::ProgressLine;
use crate::utils::path::{collect_files, logical_path};

use super::{Manifest, fingerprint, fingerprinted_path};

/// Asset classes subject to revisioning. Stylesheet classes go last.
const BINARY_CLASSES: &[&str] = &["img", "fonts", "js"];
const STYLE_CLASSES: &[&str] = &["css"];

/// `url(...)` values inside stylesheets, quoted or bare.
static CSS_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"url\(\s*['"]?([^'")\s]+)['"]?\s*\)"#).unwrap());

/// Fingerprint every revisionable asset in `output` into the static
/// directory and record the path pairs in `manifest`.
///
/// Returns the number of files revisioned. Any per-file failure (or a
/// duplicate-record conflict) aborts the phase; the manifest is only
/// persisted by the caller once this returns `Ok`.
pub fn revision_assets(
    output: &Path,
    static_dir: &str,
    manifest: &Manifest,
    progress: Option<&ProgressLine>,
) -> Result<usize> {
    let static_root = output.join(static_dir);
    let count = AtomicUsize::new(0);
    let has_error = AtomicBool::new(false);

    // Pass 1: everything a stylesheet may refer to (plus scripts)
    let binaries: Vec<_> = BINARY_CLASSES
        .iter()
        .flat_map(|class| collect_files(&output.join(class)))
        .collect();

    binaries.par_iter().try_for_each(|path| {
        if has_error.load(Ordering::Relaxed) {
            return Err(anyhow!("Aborted"));
        }
        let result = revision_file(path, output, &static_root, manifest, None);
        finish_one(result, path, &count, &has_error, progress)
    })?;

    // Pass 2: stylesheets, with url() references rewritten first
    let styles: Vec<_> = STYLE_CLASSES
        .iter()
        .flat_map(|class| collect_files(&output.join(class)))
        .collect();

    styles.par_iter().try_for_each(|path| {
        if has_error.load(Ordering::Relaxed) {
            return Err(anyhow!("Aborted"));
        }
        let result = revision_file(path, output, &static_root, manifest, Some(static_dir));
        finish_one(result, path, &count, &has_error, progress)
    })?;

    Ok(count.load(Ordering::Relaxed))
}

/// Log the first error, count successes, feed the progress line.
fn finish_one(
    result: Result<()>,
    path: &Path,
    count: &AtomicUsize,
    has_error: &AtomicBool,
    progress: Option<&ProgressLine>,
) -> Result<()> {
    if let Err(e) = result {
        if !has_error.swap(true, Ordering::Relaxed) {
            log!("error"; "{}: {:#}", path.display(), e);
        }
        return Err(anyhow!("Revision failed"));
    }
    count.fetch_add(1, Ordering::Relaxed);
    if let Some(p) = progress {
        p.inc("revision");
    }
    Ok(())
}

/// Fingerprint one file and record it.
///
/// `rewrite_static_dir` is set for stylesheets: their `url(...)` values are
/// resolved through the manifest before hashing, so the fingerprint covers
/// the bytes actually shipped.
fn revision_file(
    path: &Path,
    output: &Path,
    static_root: &Path,
    manifest: &Manifest,
    rewrite_static_dir: Option<&str>,
) -> Result<()> {
    let logical = logical_path(path, output)
        .ok_or_else(|| anyhow!("asset outside output root: {}", path.display()))?;

    let content = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    let content = match rewrite_static_dir {
        Some(static_dir) => {
            let source = String::from_utf8(content)
                .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
            rewrite_css_urls(&source, &logical, manifest, static_dir).into_bytes()
        }
        None => content,
    };

    let token = fingerprint(&content);
    let renamed = fingerprinted_path(&logical, &token);

    let dest = static_root.join(&renamed);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&dest, &content).with_context(|| format!("failed to write {}", dest.display()))?;

    manifest.record(logical, renamed)?;
    Ok(())
}

/// Rewrite `url(...)` references in a stylesheet through the manifest.
///
/// References that resolve to a recorded logical path become rooted
/// `/<static_dir>/<fingerprinted>` URLs; everything else (external URLs,
/// data URIs, unrecorded paths) is left untouched.
fn rewrite_css_urls(source: &str, css_logical: &str, manifest: &Manifest, static_dir: &str) -> String {
    let css_dir = css_logical.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");

    CSS_URL
        .replace_all(source, |caps: &regex::Captures| {
            let reference = &caps[1];
            match resolve_reference(css_dir, reference)
                .and_then(|logical| manifest.resolve(&logical))
            {
                Some(fingerprinted) => format!("url(/{}/{})", static_dir, fingerprinted),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Resolve a stylesheet reference to a logical asset path.
///
/// Rooted references (`/img/bg.png`) are taken from the output root;
/// relative references (`../img/bg.png`, `img/bg.png`) are resolved
/// against the stylesheet's own directory. External URLs, data URIs and
/// fragment/query-bearing suffixes are stripped or rejected.
fn resolve_reference(css_dir: &str, reference: &str) -> Option<String> {
    if reference.contains("://") || reference.starts_with("data:") || reference.starts_with('#') {
        return None;
    }

    // Drop ?query and #fragment suffixes
    let reference = reference
        .split_once(['?', '#'])
        .map(|(path, _)| path)
        .unwrap_or(reference);
    if reference.is_empty() {
        return None;
    }

    let mut parts: Vec<&str> = if let Some(rooted) = reference.strip_prefix('/') {
        rooted.split('/').collect()
    } else {
        css_dir
            .split('/')
            .filter(|s| !s.is_empty())
            .chain(reference.split('/'))
            .collect()
    };

    // Normalize `.` and `..` components
    let mut resolved: Vec<&str> = Vec::with_capacity(parts.len());
    for part in parts.drain(..) {
        match part {
            "" | "." => {}
            ".." => {
                resolved.pop()?;
            }
            other => resolved.push(other),
        }
    }

    if resolved.is_empty() {
        None
    } else {
        Some(resolved.join("/"))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_resolve_reference_rooted() {
        assert_eq!(resolve_reference("css", "/img/bg.png").unwrap(), "img/bg.png");
    }

    #[test]
    fn test_resolve_reference_relative() {
        assert_eq!(resolve_reference("css", "../img/bg.png").unwrap(), "img/bg.png");
        assert_eq!(resolve_reference("css", "local.css").unwrap(), "css/local.css");
    }

    #[test]
    fn test_resolve_reference_strips_query_and_fragment() {
        assert_eq!(
            resolve_reference("css", "/fonts/a.woff2?v=3#iefix").unwrap(),
            "fonts/a.woff2"
        );
    }

    #[test]
    fn test_resolve_reference_rejects_external() {
        assert!(resolve_reference("css", "https://cdn.example.com/a.png").is_none());
        assert!(resolve_reference("css", "data:image/png;base64,xyz").is_none());
        assert!(resolve_reference("css", "#gradient").is_none());
    }

    #[test]
    fn test_resolve_reference_escaping_root() {
        // `..` past the output root is not a resolvable asset
        assert!(resolve_reference("", "../outside.png").is_none());
    }

    #[test]
    fn test_rewrite_css_urls() {
        let manifest = Manifest::new();
        manifest.record("img/bg.png", "img/bg-11112222.png").unwrap();

        let css = "body { background: url(/img/bg.png); border-image: url('../img/bg.png'); }";
        let out = rewrite_css_urls(css, "css/site.css", &manifest, "static");
        assert_eq!(
            out,
            "body { background: url(/static/img/bg-11112222.png); \
             border-image: url(/static/img/bg-11112222.png); }"
        );
    }

    #[test]
    fn test_rewrite_css_urls_leaves_unknown() {
        let manifest = Manifest::new();
        let css = "a { background: url(https://cdn.example.com/x.png) url(/img/none.png); }";
        assert_eq!(rewrite_css_urls(css, "css/site.css", &manifest, "static"), css);
    }

    #[test]
    fn test_revision_assets_end_to_end() {
        let dir = TempDir::new().unwrap();
        let output = dir.path();

        write(output, "img/logo.png", b"not really a png");
        write(output, "js/main.js", b"console.log(1)");
        write(output, "css/site.css", b"h1 { background: url(/img/logo.png); }");

        let manifest = Manifest::new();
        let count = revision_assets(output, "static", &manifest, None).unwrap();
        assert_eq!(count, 3);
        assert_eq!(manifest.len(), 3);

        // Every entry points at an existing fingerprinted copy
        for logical in ["img/logo.png", "js/main.js", "css/site.css"] {
            let renamed = manifest.resolve(logical).unwrap();
            assert!(output.join("static").join(&renamed).exists(), "{renamed}");
        }

        // The revisioned stylesheet refers to the fingerprinted image
        let css_rev = manifest.resolve("css/site.css").unwrap();
        let img_rev = manifest.resolve("img/logo.png").unwrap();
        let shipped = fs::read_to_string(output.join("static").join(&css_rev)).unwrap();
        assert!(shipped.contains(&format!("url(/static/{img_rev})")));
    }

    #[test]
    fn test_revision_assets_deterministic() {
        let dir = TempDir::new().unwrap();
        let output = dir.path();
        write(output, "js/app.js", b"let x = 1;");

        let first = Manifest::new();
        revision_assets(output, "static", &first, None).unwrap();

        let second = Manifest::new();
        revision_assets(output, "static", &second, None).unwrap();

        assert_eq!(first.resolve("js/app.js"), second.resolve("js/app.js"));
    }

    #[test]
    fn test_revision_assets_empty_output() {
        let dir = TempDir::new().unwrap();
        let manifest = Manifest::new();
        let count = revision_assets(dir.path(), "static", &manifest, None).unwrap();
        assert_eq!(count, 0);
        assert!(manifest.is_empty());
    }
}
