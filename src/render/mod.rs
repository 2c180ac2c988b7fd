//! Template rendering: markdown pages through an HTML layout, with asset
//! references rewritten through the cache-bust manifest.
//!
//! Rendering has a hard dependency on a complete manifest: the build
//! orchestrator only constructs the [`AssetResolver`] after the revision
//! phase has persisted it (or as a passthrough in development), so a page
//! can never be rendered against a partial mapping.

mod layout;
mod page;
mod rewrite;

pub use layout::{LAYOUT_FILE, Layout, LayoutVars};
pub use page::{Page, load_page};
pub use rewrite::rewrite_asset_urls;

use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;

use crate::config::SiteConfig;
use crate::log;
use crate::logger::ProgressLine;
use crate::revision::AssetResolver;
use crate::utils::path::collect_files;

/// Render every markdown page under the templates directory.
///
/// Returns the number of pages written.
pub fn render_pages(
    config: &SiteConfig,
    resolver: &AssetResolver,
    progress: Option<&ProgressLine>,
) -> Result<usize> {
    let templates = &config.build.templates;
    let layout = Layout::load(templates)?;

    let sources: Vec<_> = collect_files(templates)
        .into_iter()
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("md"))
        .collect();

    let count = AtomicUsize::new(0);
    let has_error = AtomicBool::new(false);

    sources.par_iter().try_for_each(|path| {
        if has_error.load(Ordering::Relaxed) {
            return Err(anyhow!("Aborted"));
        }

        let result = render_one(path, config, &layout, resolver);
        if let Err(e) = result {
            if !has_error.swap(true, Ordering::Relaxed) {
                log!("error"; "{}: {:#}", config.root_relative(path).display(), e);
            }
            return Err(anyhow!("Render failed"));
        }

        count.fetch_add(1, Ordering::Relaxed);
        if let Some(p) = progress {
            p.inc("pages");
        }
        Ok(())
    })?;

    Ok(count.load(Ordering::Relaxed))
}

fn render_one(
    path: &std::path::Path,
    config: &SiteConfig,
    layout: &Layout,
    resolver: &AssetResolver,
) -> Result<()> {
    let page = load_page(path, &config.build.templates)?;

    let html = layout.render(&LayoutVars {
        title: &page.title,
        site_title: &config.site.title,
        content: &page.html_body,
    });
    let html = rewrite_asset_urls(&html, resolver);

    let dest = config.build.output.join(&page.output_rel);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&dest, html).with_context(|| format!("failed to write {}", dest.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn test_config(root: &Path) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.root = root.to_path_buf();
        config.site.title = "Test Site".to_string();
        config.build.assets = root.join("assets");
        config.build.templates = root.join("templates");
        config.build.output = root.join("public");
        config
    }

    #[test]
    fn test_render_pages_end_to_end() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());

        let templates = &config.build.templates;
        fs::create_dir_all(templates.join("posts")).unwrap();
        fs::write(
            templates.join(LAYOUT_FILE),
            "<html><head><title>{{ title }} - {{ site_title }}</title>\
             <link rel=\"stylesheet\" href=\"/css/site.css\"></head>\
             <body>{{ content }}</body></html>",
        )
        .unwrap();
        fs::write(
            templates.join("index.md"),
            "---\ntitle: Home\n---\n# Welcome\n",
        )
        .unwrap();
        fs::write(templates.join("posts/hello.md"), "Hello **world**.\n").unwrap();

        let count = render_pages(&config, &AssetResolver::passthrough(), None).unwrap();
        assert_eq!(count, 2);

        let index = fs::read_to_string(config.build.output.join("index.html")).unwrap();
        assert!(index.contains("<title>Home - Test Site</title>"));
        assert!(index.contains("<h1>Welcome</h1>"));
        assert!(index.contains("href=\"/css/site.css\""));

        let post =
            fs::read_to_string(config.build.output.join("posts/hello/index.html")).unwrap();
        assert!(post.contains("<strong>world</strong>"));
    }

    #[test]
    fn test_render_pages_missing_layout() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        fs::create_dir_all(&config.build.templates).unwrap();
        fs::write(config.build.templates.join("index.md"), "# Hi").unwrap();

        assert!(render_pages(&config, &AssetResolver::passthrough(), None).is_err());
    }
}
