//! Command-line interface: argument definitions and command implementations.

mod args;
pub mod build;
pub mod serve;

pub use args::{BuildArgs, Cli, Commands};
