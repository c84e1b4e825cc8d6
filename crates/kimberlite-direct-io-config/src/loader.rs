//! Configuration loader with multi-source merging

use crate::{DirectIoConfig, Paths};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    include_user_config: bool,
    env_source: Option<config::Map<String, String>>,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "KMB".to_string(),
            include_user_config: true,
            env_source: None,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "KMB")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip ~/.config/kimberlite/direct-io.toml
    pub fn without_user_config(mut self) -> Self {
        self.include_user_config = false;
        self
    }

    /// Read variables from `vars` instead of the process environment
    pub fn with_env_source(mut self, vars: config::Map<String, String>) -> Self {
        self.env_source = Some(vars);
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<DirectIoConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = DirectIoConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. User config (~/.config/kimberlite/direct-io.toml)
        if self.include_user_config {
            if let Ok(user_config_file) = Paths::new().user_config_file() {
                if user_config_file.exists() {
                    builder = builder.add_source(
                        config::File::from(user_config_file)
                            .required(false)
                            .format(config::FileFormat::Toml),
                    );
                }
            }
        }

        // 3. Project config (kimberlite-direct-io.toml)
        let project_config_file = Paths::project_config_file(&self.project_dir);
        if project_config_file.exists() {
            builder = builder.add_source(
                config::File::from(project_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 4. Local config (kimberlite-direct-io.local.toml, gitignored)
        let local_config_file = Paths::local_config_file(&self.project_dir);
        if local_config_file.exists() {
            builder = builder.add_source(
                config::File::from(local_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 5. Environment variables (KMB_DIRECT_IO__BLOCK_SIZE, ...)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env_source),
        );

        // Build and deserialize
        let config = builder.build().context("Failed to build configuration")?;

        let direct_io_config: DirectIoConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        direct_io_config
            .validate()
            .context("Configuration failed validation")?;

        Ok(direct_io_config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> DirectIoConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyncMode;
    use std::fs;
    use tempfile::tempdir;

    fn isolated(project_dir: &Path) -> ConfigLoader {
        ConfigLoader::new()
            .with_project_dir(project_dir)
            .without_user_config()
            .with_env_source(config::Map::new())
    }

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = isolated(temp_dir.path())
            .load()
            .expect("Failed to load config");

        assert_eq!(config, DirectIoConfig::default());
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        let config_content = r#"
[direct_io]
block_size = 8192
sync_mode = "data"
"#;
        fs::write(project_dir.join("kimberlite-direct-io.toml"), config_content)
            .expect("Failed to write config");

        let config = isolated(project_dir).load().expect("Failed to load config");

        assert_eq!(config.direct_io.block_size, 8192);
        assert_eq!(config.direct_io.sync_mode, SyncMode::Data);
        assert_eq!(config.direct_io.align_requirement, None);
    }

    #[test]
    fn test_local_overrides() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("kimberlite-direct-io.toml"),
            r#"
[direct_io]
block_size = 8192
"#,
        )
        .expect("Failed to write project config");

        fs::write(
            project_dir.join("kimberlite-direct-io.local.toml"),
            r#"
[direct_io]
block_size = 16384
"#,
        )
        .expect("Failed to write local config");

        let config = isolated(project_dir).load().expect("Failed to load config");

        // Local config should override project config
        assert_eq!(config.direct_io.block_size, 16384);
    }

    #[test]
    fn test_env_overrides_files() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("kimberlite-direct-io.local.toml"),
            r#"
[direct_io]
block_size = 16384
"#,
        )
        .expect("Failed to write local config");

        let mut vars = config::Map::new();
        vars.insert("KMB_DIRECT_IO__BLOCK_SIZE".to_string(), "65536".to_string());
        vars.insert(
            "KMB_DIRECT_IO__ALIGN_REQUIREMENT".to_string(),
            "512".to_string(),
        );

        let config = isolated(project_dir)
            .with_env_source(vars)
            .load()
            .expect("Failed to load config");

        assert_eq!(config.direct_io.block_size, 65536);
        assert_eq!(config.direct_io.align_requirement, Some(512));
    }

    #[test]
    fn test_invalid_layer_fails_validation() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("kimberlite-direct-io.toml"),
            r#"
[direct_io]
block_size = 4096
align_requirement = 8192
"#,
        )
        .expect("Failed to write config");

        assert!(isolated(project_dir).load().is_err());
        assert_eq!(
            isolated(project_dir).load_or_default(),
            DirectIoConfig::default()
        );
    }
}
