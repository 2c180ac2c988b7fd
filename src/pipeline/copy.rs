//! Passthrough copy pipeline.
//!
//! Copies every asset file not owned by another pipeline (fonts, favicons,
//! robots.txt, anything outside the css/js/img classes) into the output
//! directory, preserving relative paths.

use std::fs;

use anyhow::{Context, Result, anyhow};

use crate::config::SiteConfig;
use crate::logger::ProgressLine;
use crate::utils::path::{collect_files, logical_path};

use super::is_newer_than;

/// Asset classes handled by dedicated pipelines.
const PIPELINE_CLASSES: &[&str] = &["css", "js", "img"];

/// Copy passthrough assets into the output directory.
///
/// Returns the number of files copied (unchanged files are skipped in
/// incremental development rebuilds).
pub fn process_passthrough(
    config: &SiteConfig,
    clean: bool,
    progress: Option<&ProgressLine>,
) -> Result<usize> {
    let source_root = &config.build.assets;
    let output = &config.build.output;
    let mut count = 0;

    for path in collect_files(source_root) {
        let rel = logical_path(&path, source_root)
            .ok_or_else(|| anyhow!("asset outside assets root: {}", path.display()))?;

        // Skip classes owned by the styles/scripts/images pipelines
        let class = rel.split_once('/').map(|(dir, _)| dir).unwrap_or("");
        if PIPELINE_CLASSES.contains(&class) {
            continue;
        }

        let dest = output.join(&rel);
        if !clean && dest.exists() && !is_newer_than(&path, &dest) {
            continue;
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&path, &dest)
            .with_context(|| format!("failed to copy to {}", dest.display()))?;
        count += 1;
        if let Some(p) = progress {
            p.inc("static");
        }
    }

    Ok(count)
}
