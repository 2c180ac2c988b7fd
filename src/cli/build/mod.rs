//! Site building orchestration.
//!
//! Build pipeline phases, in strict order:
//! - **Init** - clean/create the output directory
//! - **Assets** - styles + scripts + images + passthrough (parallel classes)
//! - **Revision** - fingerprint built assets, persist the manifest (release)
//! - **Render** - markdown pages through the layout, URLs rewritten
//! - **Finalize** - result logging
//!
//! Each phase returns `Result`; a failure halts the sequence, so a
//! half-built asset set is never fingerprinted and rendering never sees a
//! partial manifest.

mod pipeline;

use anyhow::Result;

use crate::{
    config::SiteConfig,
    core::BuildMode,
    log, render,
    utils::plural_count,
};

/// Build the entire site.
///
/// Pipeline: init -> assets -> revision -> render -> finalize
pub fn build_site(mode: BuildMode, config: &SiteConfig, quiet: bool) -> Result<()> {
    pipeline::init_build(config, mode)?;

    let counts = pipeline::collect_build_counts(config);
    let progress = pipeline::create_progress(&counts, quiet);

    pipeline::run_asset_phases(mode, config, progress.as_ref())?;

    let resolver = pipeline::run_revision_phase(mode, config, progress.as_ref())?;

    let pages = render::render_pages(config, &resolver, progress.as_ref())?;

    if let Some(p) = progress {
        p.finish();
    }

    if !quiet {
        log!("build"; "{} rendered", plural_count(pages, "page"));
        pipeline::log_build_result(&config.build.output)?;
    }

    Ok(())
}
