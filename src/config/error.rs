//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating `plinth.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}
