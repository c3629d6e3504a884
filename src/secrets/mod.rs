//! Secrets provider
//!
//! Lazily loads one or more `secrets.toml` files and exposes nested key lookup.
//! The provider is passed explicitly to whatever needs it; there is no
//! process-wide secrets instance.

use once_cell::sync::OnceCell;
use std::path::PathBuf;

/// Secrets errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum SecretsError {
    #[error("No secrets found for `{path}`. Valid paths for a secrets.toml file are: {}", display_paths(searched))]
    MissingEntry { path: String, searched: Vec<PathBuf> },

    #[error("Secret `{path}` must be a {expected}")]
    UnexpectedType { path: String, expected: &'static str },

    #[error("Failed to read secrets file {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse secrets file {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "(none configured)".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Source of connection defaults and credentials
pub trait SecretsProvider: Send + Sync {
    /// Load the secrets files if any exist. Absent files are not an error.
    fn load_if_toml_exists(&self) -> Result<(), SecretsError>;

    /// Look up a nested value, e.g. `["connections", "my_db", "type"]`
    fn lookup(&self, path: &[&str]) -> Result<toml::Value, SecretsError>;

    /// Look up a nested value that must be a string
    fn lookup_str(&self, path: &[&str]) -> Result<String, SecretsError> {
        match self.lookup(path)? {
            toml::Value::String(value) => Ok(value),
            _ => Err(SecretsError::UnexpectedType {
                path: path.join("."),
                expected: "string",
            }),
        }
    }

    /// Like [`lookup`](Self::lookup), but a missing entry is `Ok(None)`
    fn try_lookup(&self, path: &[&str]) -> Result<Option<toml::Value>, SecretsError> {
        match self.lookup(path) {
            Ok(value) => Ok(Some(value)),
            Err(SecretsError::MissingEntry { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// TOML-backed secrets
///
/// Files are read on first use. When several files exist, top-level keys
/// from later files replace those from earlier ones.
#[derive(Debug)]
pub struct Secrets {
    paths: Vec<PathBuf>,
    table: OnceCell<toml::Table>,
}

impl Secrets {
    /// Create a provider reading the given files in order
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            table: OnceCell::new(),
        }
    }

    /// Create a provider from TOML text, without touching the filesystem
    pub fn from_toml_str(contents: &str) -> Result<Self, SecretsError> {
        let table: toml::Table = toml::from_str(contents).map_err(|e| SecretsError::Parse {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;

        let cell = OnceCell::new();
        let _ = cell.set(table);
        Ok(Self {
            paths: Vec::new(),
            table: cell,
        })
    }

    /// Files this provider reads from
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn table(&self) -> Result<&toml::Table, SecretsError> {
        self.table.get_or_try_init(|| load_tables(&self.paths))
    }
}

fn load_tables(paths: &[PathBuf]) -> Result<toml::Table, SecretsError> {
    let mut merged = toml::Table::new();
    let mut found = 0;

    for path in paths {
        if !path.exists() {
            continue;
        }

        let contents = std::fs::read_to_string(path).map_err(|e| SecretsError::Read {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let table: toml::Table = toml::from_str(&contents).map_err(|e| SecretsError::Parse {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        tracing::debug!("Loaded {} secret section(s) from {:?}", table.len(), path);
        for (key, value) in table {
            merged.insert(key, value);
        }
        found += 1;
    }

    if found == 0 {
        tracing::debug!("No secrets.toml found in {:?}", paths);
    }

    Ok(merged)
}

impl SecretsProvider for Secrets {
    fn load_if_toml_exists(&self) -> Result<(), SecretsError> {
        self.table().map(|_| ())
    }

    fn lookup(&self, path: &[&str]) -> Result<toml::Value, SecretsError> {
        let missing = || SecretsError::MissingEntry {
            path: path.join("."),
            searched: self.paths.clone(),
        };

        let table = self.table()?;
        let (first, rest) = path.split_first().ok_or_else(missing)?;
        let mut value = table.get(*first).ok_or_else(missing)?;
        for key in rest {
            value = value.get(*key).ok_or_else(missing)?;
        }

        Ok(value.clone())
    }
}
