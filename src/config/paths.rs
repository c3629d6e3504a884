//! Cross-platform directory path resolution
//!
//! Provides functions to resolve platform-appropriate paths for configuration,
//! data, and project-local files.
//! - Linux/macOS: XDG Base Directory specification (~/.config, ~/.local/share)
//! - Windows: Known Folder API (AppData\Roaming, AppData\Local)

use std::path::{Path, PathBuf};

/// Project-local directory, relative to the working directory
const PROJECT_DIR: &str = ".appwire";

/// Get the configuration directory path
///
/// Checks APPWIRE_CONFIG_DIR environment variable first, then falls back to:
/// - Unix (Linux/macOS): XDG_CONFIG_HOME/appwire or ~/.config/appwire
/// - Windows: %APPDATA%\appwire\config
pub fn config_dir() -> PathBuf {
    std::env::var("APPWIRE_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            #[cfg(windows)]
            {
                use directories::ProjectDirs;
                ProjectDirs::from("", "", "appwire")
                    .map(|dirs| dirs.config_dir().to_path_buf())
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join("appwire"))
            }
            #[cfg(not(windows))]
            {
                use directories::BaseDirs;
                std::env::var("XDG_CONFIG_HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| {
                        BaseDirs::new()
                            .map(|dirs| dirs.home_dir().join(".config"))
                            .unwrap_or_else(|| PathBuf::from(".").join(".config"))
                    })
                    .join("appwire")
            }
        })
}

/// Get the data directory path
///
/// Checks APPWIRE_DATA_DIR environment variable first, then falls back to:
/// - Unix (Linux/macOS): XDG_DATA_HOME/appwire or ~/.local/share/appwire
/// - Windows: %LOCALAPPDATA%\appwire\data
pub fn data_dir() -> PathBuf {
    std::env::var("APPWIRE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            #[cfg(windows)]
            {
                use directories::ProjectDirs;
                ProjectDirs::from("", "", "appwire")
                    .map(|dirs| dirs.data_dir().to_path_buf())
                    .unwrap_or_else(|| {
                        PathBuf::from(".")
                            .join(".local")
                            .join("share")
                            .join("appwire")
                    })
            }
            #[cfg(not(windows))]
            {
                use directories::BaseDirs;
                std::env::var("XDG_DATA_HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| {
                        BaseDirs::new()
                            .map(|dirs| dirs.home_dir().join(".local").join("share"))
                            .unwrap_or_else(|| PathBuf::from(".").join(".local").join("share"))
                    })
                    .join("appwire")
            }
        })
}

/// Get the root configuration file path
pub fn root_config_path() -> PathBuf {
    config_dir().join("config.yaml")
}

/// User-wide secrets file
pub fn global_secrets_path() -> PathBuf {
    config_dir().join("secrets.toml")
}

/// Project secrets file, relative to the working directory
pub fn project_secrets_path() -> PathBuf {
    PathBuf::from(PROJECT_DIR).join("secrets.toml")
}

/// Default location of the built frontend bundle
pub fn static_dir() -> PathBuf {
    data_dir().join("static")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        let dir = config_dir();
        assert!(dir.to_string_lossy().contains("appwire"));
    }

    #[test]
    fn test_secrets_paths() {
        assert!(global_secrets_path().ends_with("secrets.toml"));
        assert_eq!(
            project_secrets_path(),
            PathBuf::from(".appwire").join("secrets.toml")
        );
    }

    #[test]
    fn test_ensure_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
