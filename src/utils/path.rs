//! Path normalization and file collection.
//!
//! Provides consistent path handling across the codebase:
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `collect_files` - recursive file listing, sorted for determinism
//! - `logical_path` - source-relative forward-slash path strings

use std::path::{Path, PathBuf};

use jwalk::WalkDir;

/// Files never treated as build inputs.
const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db", ".gitkeep"];

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Collect all regular files under a directory, sorted by path.
///
/// Sorting keeps downstream work (script concatenation, manifest
/// accumulation order) independent of directory iteration order.
pub fn collect_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = WalkDir::new(dir)
        .parallelism(jwalk::Parallelism::Serial)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            !IGNORED_FILES.contains(&name.as_str()) && !name.starts_with('.')
        })
        .map(|e| e.path())
        .collect();
    files.sort();
    files
}

/// Build the logical path of `path` relative to `base`.
///
/// Logical paths are the manifest keys: source-relative, forward slashes
/// on every platform (e.g. `css/site.css`). Returns `None` if `path` is
/// not under `base` or is not valid UTF-8.
pub fn logical_path(path: &Path, base: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let mut out = String::new();
    for comp in rel.components() {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(comp.as_os_str().to_str()?);
    }
    if out.is_empty() { None } else { Some(out) }
}
