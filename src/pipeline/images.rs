//! Image pipeline.
//!
//! Copies every file under `assets/img/` into `output/img/`. When
//! `[build.images] max_width` is configured, raster images wider than the
//! bound are downscaled (aspect preserved) and re-encoded in their source
//! format; everything else is copied byte-for-byte. SVG and unknown
//! formats are never re-encoded.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Context, Result, anyhow};
use image::imageops::FilterType;
use rayon::prelude::*;

use crate::config::SiteConfig;
use crate::log;
use crate::logger::ProgressLine;
use crate::utils::path::{collect_files, logical_path};

use super::is_newer_than;

/// Raster formats the resize step understands.
const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Process every file under `assets/img/` into `output/img/`.
///
/// Returns the number of files written (unchanged files are skipped in
/// incremental development rebuilds).
pub fn process_images(
    config: &SiteConfig,
    clean: bool,
    progress: Option<&ProgressLine>,
) -> Result<usize> {
    let source_root = config.build.assets.join("img");
    let dest_root = config.build.output.join("img");
    let max_width = config.build.images.max_width;

    let files = collect_files(&source_root);
    let count = AtomicUsize::new(0);
    let has_error = AtomicBool::new(false);

    files.par_iter().try_for_each(|path| {
        if has_error.load(Ordering::Relaxed) {
            return Err(anyhow!("Aborted"));
        }

        let result = process_image(path, &source_root, &dest_root, max_width, clean, &count);
        if let Err(e) = result {
            if !has_error.swap(true, Ordering::Relaxed) {
                log!("error"; "{}: {:#}", path.display(), e);
            }
            return Err(anyhow!("Image processing failed"));
        }
        if let Some(p) = progress {
            p.inc("images");
        }
        Ok(())
    })?;

    Ok(count.load(Ordering::Relaxed))
}

fn process_image(
    path: &Path,
    source_root: &Path,
    dest_root: &Path,
    max_width: Option<u32>,
    clean: bool,
    count: &AtomicUsize,
) -> Result<()> {
    let rel = logical_path(path, source_root)
        .ok_or_else(|| anyhow!("image outside assets root: {}", path.display()))?;
    let dest = dest_root.join(&rel);

    // Skip if up-to-date (mtime comparison; release builds start clean)
    if !clean && dest.exists() && !is_newer_than(path, &dest) {
        return Ok(());
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if let Some(bound) = max_width
        && RASTER_EXTENSIONS.contains(&ext.as_str())
        && resize_into(path, &dest, bound)?
    {
        count.fetch_add(1, Ordering::Relaxed);
        return Ok(());
    }

    fs::copy(path, &dest).with_context(|| format!("failed to copy to {}", dest.display()))?;
    count.fetch_add(1, Ordering::Relaxed);
    Ok(())
}

/// Downscale `path` into `dest` if it is wider than `bound`.
///
/// Returns `false` when the image is already within bounds (caller copies
/// it unmodified instead, avoiding a decode/re-encode quality loss).
fn resize_into(path: &Path, dest: &Path, bound: u32) -> Result<bool> {
    // Container metadata only, no full decode
    let (width, height) = image::image_dimensions(path)
        .with_context(|| format!("failed to read dimensions of {}", path.display()))?;

    if width <= bound {
        return Ok(false);
    }

    let img = image::open(path).with_context(|| format!("failed to decode {}", path.display()))?;
    let max_height = (u64::from(height) * u64::from(bound) / u64::from(width)).max(1) as u32;
    let resized = img.resize(bound, max_height, FilterType::Lanczos3);
    resized
        .save(dest)
        .with_context(|| format!("failed to encode {}", dest.display()))?;
    Ok(true)
}
