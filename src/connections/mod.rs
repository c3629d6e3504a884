// Connection system for appwire
//
// Resolves connector types by short name, qualified path or class reference,
// builds connector instances once per identity and shares them across callers.

pub mod builtin;
pub mod cache;
pub mod connector;
pub mod driver;
pub mod factory;
pub mod modules;
pub mod registry;

pub use builtin::{SnowparkConnection, SqlConnection};
pub use cache::{ConnectionCache, ConnectionKey};
pub use connector::{
    ConnectContext, Connection, ConnectionParams, ConnectionType, Connector, ConnectorClass,
};
pub use driver::{QueryDriver, Row};
pub use factory::ConnectionFactory;
pub use modules::{Export, Module, ModuleCatalog, ModuleLoader};
pub use registry::{BUILTIN_CONNECTORS, BuiltinConnector, ConnectorRegistry};

use crate::secrets::SecretsError;

/// Connection errors
///
/// Cloneable so that a single construction failure can be handed to every
/// caller waiting on the same connection identity.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectionError {
    #[error("Invalid connection '{requested}'. Supported connection types: {}", supported.join(", "))]
    UnsupportedConnectionType {
        requested: String,
        supported: Vec<String>,
    },

    #[error("No module named '{module}'")]
    ModuleLoad { module: String },

    #[error("Module '{module}' has no attribute '{attribute}'")]
    AttributeLoad { module: String, attribute: String },

    #[error("{class} is not a connector class: {reason}")]
    InvalidConnectionClass { class: String, reason: String },

    #[error(transparent)]
    Secrets(#[from] SecretsError),

    #[error("{message}. {hint}")]
    DependencyMissing {
        module: Option<String>,
        message: String,
        hint: String,
    },

    #[error("Failed to create connection '{name}': {message}")]
    Construction { name: String, message: String },
}

/// Result type for connection operations
pub type ConnectionResult<T> = Result<T, ConnectionError>;
