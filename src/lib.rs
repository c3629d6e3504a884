//! appwire library
//!
//! Connection factory with secrets-backed defaults and single-flight caching,
//! plus static asset publishing for report sharing. Used by the `appwire`
//! binary and by embedding applications.

pub mod cli;
pub mod config;
pub mod connections;
pub mod secrets;
pub mod storage;
pub mod telemetry;

// Re-export commonly used types for convenience
pub use connections::{
    Connection, ConnectionError, ConnectionFactory, ConnectionParams, ConnectionType, Connector,
    ModuleCatalog,
};
pub use secrets::{Secrets, SecretsProvider};
pub use storage::{PlaceholderStorage, ReportStorage, StaticAssets};
