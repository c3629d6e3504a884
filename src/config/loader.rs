//! Configuration loading and merging logic
//!
//! Handles loading configuration from multiple sources and merging them
//! according to precedence rules.

use super::{defaults, paths, schema::Config};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    ///
    /// Precedence order (highest to lowest):
    /// 1. Environment variable overrides
    /// 2. Root config file
    /// 3. Built-in defaults
    pub fn load() -> Result<Config> {
        Self::load_from(&paths::root_config_path())
    }

    /// Load configuration using `path` as the config file
    pub fn load_from(path: &Path) -> Result<Config> {
        let mut config = Self::load_defaults();

        if path.exists() {
            config = Self::load_file(path)?;
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
        }

        Ok(Self::apply_env_overrides(config))
    }

    /// Load configuration from a file
    ///
    /// Missing keys take their default values.
    pub fn load_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration by loading and checking for errors
    ///
    /// This performs strict validation - it will fail on:
    /// - Invalid YAML syntax
    /// - Invalid value types
    /// - A storage base url that is not an absolute url
    pub fn validate() -> Result<()> {
        let config = Self::load().context("Failed to load merged configuration")?;

        url::Url::parse(&config.storage.base_url).with_context(|| {
            format!(
                "storage.baseUrl is not a valid url: {}",
                config.storage.base_url
            )
        })?;

        Ok(())
    }

    /// Load default configuration
    pub fn load_defaults() -> Config {
        defaults::default_config()
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: Config) -> Config {
        // APPWIRE_STATIC_DIR override
        if let Ok(dir) = std::env::var("APPWIRE_STATIC_DIR") {
            config.storage.static_dir = PathBuf::from(dir);
        }

        // APPWIRE_SECRETS_FILE override, replaces the search list
        if let Ok(file) = std::env::var("APPWIRE_SECRETS_FILE") {
            config.secrets.paths = vec![PathBuf::from(file)];
        }

        // APPWIRE_GATHER_USAGE_STATS override
        if let Ok(gather) = std::env::var("APPWIRE_GATHER_USAGE_STATS") {
            if let Ok(val) = gather.parse::<bool>() {
                config.telemetry.gather_usage_stats = val;
            }
        }

        config
    }

    /// Save configuration to a file
    pub fn save(config: &Config, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)?;
        }

        let yaml =
            serde_yaml::to_string(config).context("Failed to serialize configuration to YAML")?;

        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
