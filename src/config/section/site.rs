//! `[site]` section: site metadata.

use serde::Deserialize;

/// Site metadata used by the template renderer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteSectionConfig {
    /// Site title, available to the layout as `{{ site_title }}`
    pub title: String,

    /// Canonical site URL (informational)
    pub url: Option<String>,
}
