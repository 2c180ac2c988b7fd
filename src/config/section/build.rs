//! `[build]` section: pipeline directories and output settings.

use std::path::PathBuf;

use serde::Deserialize;

/// Build settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildSectionConfig {
    /// Asset source directory (css/, js/, img/, fonts/, static/ classes)
    pub assets: PathBuf,

    /// Template directory (markdown pages + layout.html)
    pub templates: PathBuf,

    /// Output directory for the built site
    pub output: PathBuf,

    /// Directory name under output for fingerprinted assets + manifest
    pub static_dir: String,

    /// Minify CSS/JS in release builds
    pub minify: bool,

    /// Image pipeline settings
    pub images: ImagesConfig,

    /// Clean output directory before building (CLI only)
    #[serde(skip)]
    pub clean: bool,
}

impl Default for BuildSectionConfig {
    fn default() -> Self {
        Self {
            assets: PathBuf::from("assets"),
            templates: PathBuf::from("templates"),
            output: PathBuf::from("public"),
            static_dir: "static".to_string(),
            minify: true,
            images: ImagesConfig::default(),
            clean: false,
        }
    }
}

/// `[build.images]` settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Downscale raster images wider than this (pixels). None = copy as-is.
    pub max_width: Option<u32>,
}
