//! Plinth - a static site asset pipeline with cache-busted builds and live reload.

#![allow(dead_code)]

mod cli;
mod config;
mod core;
mod logger;
mod pipeline;
mod reload;
mod render;
mod revision;
mod utils;

use std::sync::Arc;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands, build::build_site};
use config::SiteConfig;
use core::BuildMode;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = SiteConfig::load(&cli)?;

    match &cli.command {
        Commands::Build { .. } => build_site(BuildMode::RELEASE, &config, false),
        Commands::Serve { .. } => cli::serve::serve_site(Arc::new(config)),
    }
}
