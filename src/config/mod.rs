//! Configuration system for appwire
//!
//! Layered configuration: built-in defaults, the root config file, then
//! environment variable overrides.

mod defaults;
pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::Config;

use std::path::PathBuf;

/// Get a configuration value by key (dot notation)
pub fn get_config_value(config: &schema::Config, key: &str) -> anyhow::Result<String> {
    match key {
        "secrets.paths" => {
            // Return as YAML array
            serde_yaml::to_string(&config.secrets.paths)
                .map_err(|e| anyhow::anyhow!("Failed to serialize secrets.paths: {}", e))
        }
        "storage.staticDir" => Ok(config.storage.static_dir.display().to_string()),
        "storage.baseUrl" => Ok(config.storage.base_url.clone()),
        "telemetry.gatherUsageStats" => Ok(config.telemetry.gather_usage_stats.to_string()),
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}

/// Set a configuration value by key (dot notation)
pub fn set_config_value(config: &mut schema::Config, key: &str, value: &str) -> anyhow::Result<()> {
    use anyhow::Context;
    match key {
        "secrets.paths" => {
            // Parse as YAML array or comma-separated list
            config.secrets.paths = if value.trim_start().starts_with('[') {
                serde_yaml::from_str(value)
                    .context("secrets.paths must be a YAML array (e.g., ['a.toml', 'b.toml'])")?
            } else {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .collect()
            };
        }
        "storage.staticDir" => {
            config.storage.static_dir = PathBuf::from(value);
        }
        "storage.baseUrl" => {
            url::Url::parse(value).context("storage.baseUrl must be an absolute url")?;
            config.storage.base_url = value.to_string();
        }
        "telemetry.gatherUsageStats" => {
            config.telemetry.gather_usage_stats = value
                .parse()
                .context("telemetry.gatherUsageStats must be 'true' or 'false'")?;
        }
        _ => return Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_config_value() {
        let config = Config::default();
        assert_eq!(
            get_config_value(&config, "telemetry.gatherUsageStats").unwrap(),
            "true"
        );
        assert!(get_config_value(&config, "ui.skin").is_err());
    }

    #[test]
    fn test_set_config_value() {
        let mut config = Config::default();
        set_config_value(&mut config, "secrets.paths", "a.toml, b.toml").unwrap();
        assert_eq!(
            config.secrets.paths,
            vec![PathBuf::from("a.toml"), PathBuf::from("b.toml")]
        );

        set_config_value(&mut config, "telemetry.gatherUsageStats", "false").unwrap();
        assert!(!config.telemetry.gather_usage_stats);

        assert!(set_config_value(&mut config, "storage.baseUrl", "not a url").is_err());
        assert!(set_config_value(&mut config, "telemetry.gatherUsageStats", "maybe").is_err());
    }
}
