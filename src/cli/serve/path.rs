//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

/// Resolve URL to filesystem path, handling index.html for directories
pub fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);

    // Reject paths with suspicious patterns early
    if clean.contains("..") {
        return None;
    }

    let local = serve_root.join(&clean);

    // Canonicalize to resolve symlinks and verify path is under serve_root
    // This prevents traversal via symlinks or encoded sequences
    let canonical = local.canonicalize().ok()?;
    let root_canonical = serve_root.canonicalize().ok()?;

    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }

    None
}

/// Normalize URL: strip query string, trim slashes
fn normalize_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_file_and_directory_index() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("posts/hello")).unwrap();
        fs::write(root.join("index.html"), "home").unwrap();
        fs::write(root.join("posts/hello/index.html"), "post").unwrap();

        let resolved = resolve_path("/", root).unwrap();
        assert!(resolved.ends_with("index.html"));

        let resolved = resolve_path("/posts/hello/", root).unwrap();
        assert!(resolved.ends_with("posts/hello/index.html"));

        assert!(resolve_path("/missing/", root).is_none());
    }

    #[test]
    fn test_resolve_strips_query() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.js"), "x").unwrap();
        let resolved = resolve_path("/app.js?v=2", dir.path()).unwrap();
        assert!(resolved.ends_with("app.js"));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        assert!(resolve_path("/../etc/passwd", dir.path()).is_none());
    }
}
