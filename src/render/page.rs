//! Page loading: YAML front matter + markdown body.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use gray_matter::{Matter, engine::YAML};
use pulldown_cmark::{Options, Parser, html};
use serde::Deserialize;

use crate::utils::path::logical_path;

/// Optional front matter fields on a page.
#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    title: Option<String>,
}

/// A loaded, markdown-rendered page ready for the layout.
#[derive(Debug)]
pub struct Page {
    /// Template-relative source path (e.g. `posts/hello.md`)
    pub rel: String,
    /// Page title (front matter, falling back to the file stem)
    pub title: String,
    /// Rendered markdown body
    pub html_body: String,
    /// Output path relative to the output root (pretty URLs)
    pub output_rel: String,
}

/// Load a markdown page from the templates directory.
pub fn load_page(path: &Path, templates_root: &Path) -> Result<Page> {
    let rel = logical_path(path, templates_root)
        .ok_or_else(|| anyhow!("page outside templates root: {}", path.display()))?;

    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let matter = Matter::<YAML>::new();
    let parsed = matter
        .parse::<FrontMatter>(&source)
        .map_err(|e| anyhow!("malformed front matter: {e}"))?;
    let front = parsed.data.unwrap_or_default();

    let stem = rel
        .rsplit_once('/')
        .map(|(_, file)| file)
        .unwrap_or(&rel)
        .trim_end_matches(".md");
    let title = front.title.unwrap_or_else(|| stem.to_string());

    Ok(Page {
        title,
        html_body: markdown_to_html(&parsed.content),
        output_rel: output_rel(&rel),
        rel,
    })
}

/// Render markdown to HTML.
fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, parser);
    out
}

/// Map a template-relative page path to its output path (pretty URLs).
///
/// `index.md` -> `index.html`; `about.md` -> `about/index.html`;
/// `posts/hello.md` -> `posts/hello/index.html`.
fn output_rel(rel: &str) -> String {
    let stripped = rel.trim_end_matches(".md");
    if stripped == "index" || stripped.ends_with("/index") {
        format!("{stripped}.html")
    } else {
        format!("{stripped}/index.html")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_output_rel() {
        assert_eq!(output_rel("index.md"), "index.html");
        assert_eq!(output_rel("about.md"), "about/index.html");
        assert_eq!(output_rel("posts/hello.md"), "posts/hello/index.html");
        assert_eq!(output_rel("posts/index.md"), "posts/index.html");
    }

    #[test]
    fn test_load_page_with_front_matter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hello.md");
        fs::write(&path, "---\ntitle: Hello Page\n---\n# Heading\n\nBody text.").unwrap();

        let page = load_page(&path, dir.path()).unwrap();
        assert_eq!(page.rel, "hello.md");
        assert_eq!(page.title, "Hello Page");
        assert!(page.html_body.contains("<h1>Heading</h1>"));
        assert!(!page.html_body.contains("title:"));
    }

    #[test]
    fn test_load_page_without_front_matter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        fs::write(&path, "plain *markdown*").unwrap();

        let page = load_page(&path, dir.path()).unwrap();
        // Title falls back to the file stem
        assert_eq!(page.title, "notes");
        assert!(page.html_body.contains("<em>markdown</em>"));
    }

    #[test]
    fn test_markdown_tables() {
        let html = markdown_to_html("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<table>"));
    }
}
