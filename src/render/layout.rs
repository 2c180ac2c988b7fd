//! HTML layout with typed variable substitution.

use std::path::Path;

use anyhow::{Context, Result, anyhow};

/// Layout filename inside the templates directory.
pub const LAYOUT_FILE: &str = "layout.html";

/// Variables available to the layout.
pub struct LayoutVars<'a> {
    /// Page title (front matter or file stem)
    pub title: &'a str,
    /// Site title from `[site] title`
    pub site_title: &'a str,
    /// Rendered page body
    pub content: &'a str,
}

impl LayoutVars<'_> {
    fn apply(&self, template: &str) -> String {
        template
            .replace("{{ title }}", self.title)
            .replace("{{ site_title }}", self.site_title)
            .replace("{{ content }}", self.content)
    }
}

/// The site-wide HTML layout.
#[derive(Debug, Clone)]
pub struct Layout {
    template: String,
}

impl Layout {
    /// Load `layout.html` from the templates directory.
    pub fn load(templates_root: &Path) -> Result<Self> {
        let path = templates_root.join(LAYOUT_FILE);
        if !path.is_file() {
            return Err(anyhow!(
                "layout not found: {} (every site needs a {})",
                path.display(),
                LAYOUT_FILE
            ));
        }
        let template = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self { template })
    }

    /// Render the layout with the given variables.
    pub fn render(&self, vars: &LayoutVars) -> String {
        vars.apply(&self.template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_all_vars() {
        let layout = Layout {
            template: "<title>{{ title }} | {{ site_title }}</title><main>{{ content }}</main>"
                .to_string(),
        };
        let html = layout.render(&LayoutVars {
            title: "Home",
            site_title: "Example",
            content: "<p>hi</p>",
        });
        assert_eq!(
            html,
            "<title>Home | Example</title><main><p>hi</p></main>"
        );
    }

    #[test]
    fn test_load_missing_layout() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(Layout::load(dir.path()).is_err());
    }
}
