use anyhow::{Context, Result, anyhow};
use std::{fs, path::Path};

use crate::{
    config::SiteConfig,
    core::BuildMode,
    log,
    logger::ProgressLine,
    pipeline::{process_images, process_passthrough, process_scripts, process_styles},
    revision::{AssetResolver, Manifest, revision_assets},
    utils::path::collect_files,
};

/// Pre-build file counts for the progress display.
pub(super) struct BuildCounts {
    styles: usize,
    scripts: usize,
    images: usize,
    fonts: usize,
    passthrough: usize,
    pages: usize,
}

impl BuildCounts {
    /// Files the revision phase will fingerprint (release builds start
    /// clean, so the output classes mirror the source classes exactly).
    fn revision(&self) -> usize {
        let bundle = usize::from(self.scripts > 0);
        self.styles + bundle + self.images + self.fonts
    }
}

/// Initialize the output directory.
///
/// Release builds always start clean: the manifest must reflect exactly
/// this build's asset set, and stale fingerprinted copies must not
/// accumulate. Development builds clean only on request.
pub(super) fn init_build(config: &SiteConfig, mode: BuildMode) -> Result<()> {
    let output = &config.build.output;

    if (mode.fingerprint || config.build.clean) && output.exists() {
        fs::remove_dir_all(output)
            .with_context(|| format!("failed to clear output directory: {}", output.display()))?;
    }

    fs::create_dir_all(output)
        .with_context(|| format!("failed to create output directory: {}", output.display()))?;
    Ok(())
}

/// Count input files per pipeline for progress totals.
pub(super) fn collect_build_counts(config: &SiteConfig) -> BuildCounts {
    let assets = &config.build.assets;
    let count_class = |class: &str| collect_files(&assets.join(class)).len();

    let all = collect_files(assets).len();
    let styles = count_class("css");
    let scripts = count_class("js");
    let images = count_class("img");
    let fonts = count_class("fonts");
    let passthrough = all - styles - scripts - images;

    let pages = collect_files(&config.build.templates)
        .iter()
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("md"))
        .count();

    BuildCounts {
        styles,
        scripts,
        images,
        fonts,
        passthrough,
        pages,
    }
}

/// Create progress display if not quiet
pub(super) fn create_progress(counts: &BuildCounts, quiet: bool) -> Option<ProgressLine> {
    if quiet {
        return None;
    }
    Some(ProgressLine::new(&[
        ("styles", counts.styles),
        ("scripts", counts.scripts),
        ("images", counts.images),
        ("static", counts.passthrough),
        ("revision", counts.revision()),
        ("pages", counts.pages),
    ]))
}

/// Run the four asset pipelines. Classes are independent of each other,
/// so they run concurrently; the phase completes only when all succeed.
pub(super) fn run_asset_phases(
    mode: BuildMode,
    config: &SiteConfig,
    progress: Option<&ProgressLine>,
) -> Result<()> {
    let clean = config.build.clean || mode.fingerprint;

    let ((styles, scripts), (images, passthrough)) = rayon::join(
        || {
            rayon::join(
                || process_styles(config, mode, progress),
                || process_scripts(config, mode, progress),
            )
        },
        || {
            rayon::join(
                || process_images(config, clean, progress),
                || process_passthrough(config, clean, progress),
            )
        },
    );

    styles?;
    scripts?;
    images?;
    passthrough?;
    Ok(())
}

/// Fingerprint assets and persist the manifest (release only).
///
/// Returns the resolver the render phase must use. The manifest is
/// reloaded from disk after persisting - rendering consumes the persisted
/// artifact, never the accumulator - so the persist/load pair is the
/// synchronization point between the phases.
pub(super) fn run_revision_phase(
    mode: BuildMode,
    config: &SiteConfig,
    progress: Option<&ProgressLine>,
) -> Result<AssetResolver> {
    if !mode.fingerprint {
        return Ok(AssetResolver::passthrough());
    }

    let output = &config.build.output;
    let static_dir = &config.build.static_dir;

    let manifest = Manifest::new();
    revision_assets(output, static_dir, &manifest, progress)?;

    let location = Manifest::location(output, static_dir);
    manifest
        .persist(&location)
        .context("failed to persist asset manifest (fatal for release builds)")?;

    let persisted = Manifest::load(&location)?
        .ok_or_else(|| anyhow!("asset manifest missing right after persist"))?;
    Ok(AssetResolver::fingerprinted(persisted, static_dir))
}

/// Warn when the build produced nothing.
pub(super) fn log_build_result(output: &Path) -> Result<()> {
    let file_count = fs::read_dir(output)?.filter_map(Result::ok).count();

    if file_count == 0 {
        log!("warning"; "output is empty, check the assets and templates directories");
    } else {
        log!("build"; "done");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site_fixture() -> (TempDir, SiteConfig) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        let mut config = SiteConfig::default();
        config.root = root.to_path_buf();
        config.site.title = "Fixture".to_string();
        config.build.assets = root.join("assets");
        config.build.templates = root.join("templates");
        config.build.output = root.join("public");

        for class in ["css", "js", "img", "fonts"] {
            fs::create_dir_all(config.build.assets.join(class)).unwrap();
        }
        fs::create_dir_all(&config.build.templates).unwrap();

        fs::write(
            config.build.assets.join("css/site.css"),
            "body { background: url(/img/logo.png); color: red; }",
        )
        .unwrap();
        fs::write(config.build.assets.join("js/app.js"), "console.log('hi');").unwrap();
        fs::write(config.build.assets.join("img/logo.png"), "png bytes").unwrap();
        fs::write(config.build.assets.join("fonts/a.woff2"), "font bytes").unwrap();

        fs::write(
            config.build.templates.join("layout.html"),
            "<html><head><title>{{ title }}</title>\
             <link rel=\"stylesheet\" href=\"/css/site.css\">\
             <script src=\"/js/main.js\"></script></head>\
             <body>{{ content }}</body></html>",
        )
        .unwrap();
        fs::write(
            config.build.templates.join("index.md"),
            "---\ntitle: Home\n---\n![logo](/img/logo.png)\n",
        )
        .unwrap();

        (dir, config)
    }

    #[test]
    fn test_release_build_end_to_end() {
        let (_dir, config) = site_fixture();

        crate::cli::build::build_site(BuildMode::RELEASE, &config, true).unwrap();

        let output = &config.build.output;

        // Manifest persisted at the well-known location with all classes
        let manifest = Manifest::load(&Manifest::location(output, "static"))
            .unwrap()
            .unwrap();
        let css_rev = manifest.resolve("css/site.css").unwrap();
        let js_rev = manifest.resolve("js/main.js").unwrap();
        let img_rev = manifest.resolve("img/logo.png").unwrap();
        assert!(manifest.resolve("fonts/a.woff2").is_some());

        // Fingerprinted copies exist
        for rev in [&css_rev, &js_rev, &img_rev] {
            assert!(output.join("static").join(rev).exists());
        }

        // Rendered page refers to fingerprinted URLs only
        let html = fs::read_to_string(output.join("index.html")).unwrap();
        assert!(html.contains(&format!("/static/{css_rev}")));
        assert!(html.contains(&format!("/static/{js_rev}")));
        assert!(html.contains(&format!("/static/{img_rev}")));
        assert!(!html.contains("\"/css/site.css\""));

        // Revisioned CSS points at the fingerprinted image and is minified
        let css = fs::read_to_string(output.join("static").join(&css_rev)).unwrap();
        assert!(css.contains(&format!("/static/{img_rev}")));
        assert!(!css.contains('\n'));
    }

    #[test]
    fn test_development_build_skips_revisioning() {
        let (_dir, config) = site_fixture();

        crate::cli::build::build_site(BuildMode::DEVELOPMENT, &config, true).unwrap();

        let output = &config.build.output;
        assert!(!Manifest::location(output, "static").exists());

        // Logical paths served verbatim
        let html = fs::read_to_string(output.join("index.html")).unwrap();
        assert!(html.contains("href=\"/css/site.css\""));
        assert!(html.contains("src=\"/js/main.js\""));
    }

    #[test]
    fn test_release_build_removes_stale_manifest_entries() {
        let (_dir, config) = site_fixture();

        crate::cli::build::build_site(BuildMode::RELEASE, &config, true).unwrap();

        // Delete an asset and rebuild: its entry must not survive
        fs::remove_file(config.build.assets.join("img/logo.png")).unwrap();
        crate::cli::build::build_site(BuildMode::RELEASE, &config, true).unwrap();

        let manifest =
            Manifest::load(&Manifest::location(&config.build.output, "static"))
                .unwrap()
                .unwrap();
        assert!(manifest.resolve("img/logo.png").is_none());
        assert!(manifest.resolve("css/site.css").is_some());
    }

    #[test]
    fn test_build_fails_on_bad_stylesheet() {
        let (_dir, config) = site_fixture();
        fs::write(
            config.build.assets.join("css/broken.css"),
            "body { color: red; } }",
        )
        .unwrap();

        let result = crate::cli::build::build_site(BuildMode::RELEASE, &config, true);
        assert!(result.is_err());

        // Failed phase halts the sequence: no manifest was written
        assert!(!Manifest::location(&config.build.output, "static").exists());
    }
}
