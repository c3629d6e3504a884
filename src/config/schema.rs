//! Configuration schema definitions
//!
//! Defines the structure of configuration files using serde for serialization.

use super::paths;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Secrets configuration
    #[serde(default)]
    pub secrets: SecretsConfig,

    /// Report storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Secrets configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecretsConfig {
    /// secrets.toml files, later files override earlier ones
    #[serde(default = "default_secrets_paths")]
    pub paths: Vec<PathBuf>,
}

/// Report storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Directory holding the built frontend bundle
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Base url reports are published under
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryConfig {
    /// Count usage events
    #[serde(default = "default_true")]
    pub gather_usage_stats: bool,
}

// Default value functions
fn default_secrets_paths() -> Vec<PathBuf> {
    vec![paths::global_secrets_path(), paths::project_secrets_path()]
}

fn default_static_dir() -> PathBuf {
    paths::static_dir()
}

fn default_base_url() -> String {
    "https://share.appwire.invalid/reports".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            paths: default_secrets_paths(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            static_dir: default_static_dir(),
            base_url: default_base_url(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            gather_usage_stats: default_true(),
        }
    }
}
