//! Configuration management for the Kimberlite direct I/O layer
//!
//! Provides hierarchical loading of [`DirectIoOptions`] from multiple sources:
//! 1. Environment variables (KMB_DIRECT_IO__* prefix, highest precedence)
//! 2. kimberlite-direct-io.local.toml (gitignored, local overrides)
//! 3. kimberlite-direct-io.toml (git-tracked, project config)
//! 4. ~/.config/kimberlite/direct-io.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! ```toml
//! [direct_io]
//! block_size = 4096
//! align_requirement = 512
//! sync_mode = "data"
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use kimberlite_direct_io::{DirectIoOptions, SyncMode};
pub use loader::ConfigLoader;
pub use paths::{LOCAL_CONFIG_FILE, PROJECT_CONFIG_FILE, Paths};

/// Top-level direct I/O configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectIoConfig {
    pub direct_io: DirectIoOptions,
}

impl DirectIoConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Parse and validate a single TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a single TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Render as a TOML document, e.g. for `kimberlite-direct-io.toml`
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check that the options describe a usable configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.direct_io.validate()?;
        Ok(())
    }
}
