//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

use kimberlite_direct_io::IoError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] IoError),

    #[error("XDG directory error: {0}")]
    XdgError(String),
}
