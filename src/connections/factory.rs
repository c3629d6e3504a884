//! Connection factory
//!
//! Public entry point for connections. Every request is recorded with
//! telemetry, resolved to a connector class, then served from the connection
//! cache, which builds the connector on first use.

use super::builtin::{SnowparkConnection, SqlConnection};
use super::cache::{ConnectionCache, ConnectionKey};
use super::connector::{
    downcast_connection, ConnectContext, Connection, ConnectionParams, ConnectionType, Connector,
    ConnectorClass,
};
use super::modules::ModuleLoader;
use super::registry::ConnectorRegistry;
use super::{ConnectionError, ConnectionResult};
use crate::secrets::{SecretsError, SecretsProvider};
use crate::telemetry::{Telemetry, CONNECTION_EVENT};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

/// Missing dependency text produced by module loading
static MODULE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"No module named '([^']+)'").expect("module pattern is valid"));

/// Known driver modules and the package that provides them
const DEPENDENCY_PACKAGES: &[(&str, &str)] = &[
    ("sqlx", "sqlx"),
    ("snowflake", "snowflake-api"),
    ("snowflake.snowpark", "snowflake-api"),
];

/// Package providing `module`, if known
pub fn package_for_module(module: &str) -> Option<&'static str> {
    DEPENDENCY_PACKAGES
        .iter()
        .find(|(name, _)| *name == module)
        .map(|(_, package)| *package)
}

/// Creates and caches connections
pub struct ConnectionFactory {
    registry: ConnectorRegistry,
    secrets: Arc<dyn SecretsProvider>,
    cache: ConnectionCache<Arc<dyn Connection>>,
    telemetry: Arc<dyn Telemetry>,
}

impl ConnectionFactory {
    /// Create a factory
    ///
    /// * `secrets` - provides `connections.<name>` defaults and types
    /// * `modules` - resolves qualified connector names and driver modules
    /// * `telemetry` - records one event per [`create`](Self::create) call
    pub fn new(
        secrets: Arc<dyn SecretsProvider>,
        modules: Arc<dyn ModuleLoader>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            registry: ConnectorRegistry::new(modules),
            secrets,
            cache: ConnectionCache::new(),
            telemetry,
        }
    }

    /// Connector registry used for resolution
    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    /// Connection cache
    pub fn cache(&self) -> &ConnectionCache<Arc<dyn Connection>> {
        &self.cache
    }

    /// Create a connection, or return the cached one for the same identity
    ///
    /// When `connection_type` is `None` the type is read from
    /// `connections.<name>.type` in the secrets; a missing entry is an error.
    pub async fn create(
        &self,
        name: &str,
        connection_type: Option<ConnectionType>,
        params: ConnectionParams,
    ) -> ConnectionResult<Arc<dyn Connection>> {
        self.telemetry.record(CONNECTION_EVENT);

        let connection_type = match connection_type {
            Some(connection_type) => connection_type,
            None => self.type_from_secrets(name)?,
        };

        let class = self.registry.resolve(&connection_type)?;
        tracing::debug!("Resolved connection '{}' to {}", name, class);

        self.get_or_build(name, class, params).await
    }

    /// Create a connection of a concrete connector type
    pub async fn create_as<T: Connector>(
        &self,
        name: &str,
        params: ConnectionParams,
    ) -> ConnectionResult<Arc<T>> {
        let connection = self
            .create(name, Some(ConnectionType::of::<T>()), params)
            .await?;

        downcast_connection::<T>(connection).ok_or_else(|| ConnectionError::InvalidConnectionClass {
            class: T::TYPE_PATH.to_string(),
            reason: "connection was built as a different type".to_string(),
        })
    }

    /// Create a SQL connection
    pub async fn sql(
        &self,
        name: &str,
        params: ConnectionParams,
    ) -> ConnectionResult<Arc<SqlConnection>> {
        self.create_as::<SqlConnection>(name, params).await
    }

    /// Create a Snowpark connection
    pub async fn snowpark(
        &self,
        name: &str,
        params: ConnectionParams,
    ) -> ConnectionResult<Arc<SnowparkConnection>> {
        self.create_as::<SnowparkConnection>(name, params).await
    }

    fn type_from_secrets(&self, name: &str) -> ConnectionResult<ConnectionType> {
        self.secrets.load_if_toml_exists()?;
        let connection_type = self.secrets.lookup_str(&["connections", name, "type"])?;

        tracing::debug!(
            "Connection '{}' uses type '{}' from secrets",
            name,
            connection_type
        );
        Ok(ConnectionType::Named(connection_type))
    }

    /// The `connections.<name>` secrets section, without `type`
    fn secrets_section(&self, name: &str) -> ConnectionResult<ConnectionParams> {
        self.secrets.load_if_toml_exists()?;

        match self.secrets.try_lookup(&["connections", name])? {
            None => Ok(ConnectionParams::new()),
            Some(toml::Value::Table(table)) => Ok(table
                .into_iter()
                .filter(|(key, _)| key != "type")
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect()),
            Some(_) => Err(SecretsError::UnexpectedType {
                path: format!("connections.{}", name),
                expected: "table",
            }
            .into()),
        }
    }

    async fn get_or_build(
        &self,
        name: &str,
        class: ConnectorClass,
        params: ConnectionParams,
    ) -> ConnectionResult<Arc<dyn Connection>> {
        let key = ConnectionKey::new(name, &class, &params);

        // Secrets files are read here, outside the cache lock.
        let ctx = ConnectContext {
            connection_name: name.to_string(),
            params,
            secrets: self.secrets_section(name)?,
            modules: self.registry.modules(),
        };

        self.cache
            .get_or_create(key, move || async move {
                let name = ctx.connection_name.clone();
                class
                    .construct(ctx)
                    .await
                    .map_err(|e| construction_error(&name, e))
            })
            .await
    }
}

/// Convert a constructor failure, enriching missing-dependency failures
fn construction_error(name: &str, error: anyhow::Error) -> ConnectionError {
    let message = format!("{:#}", error);

    let module_load_failure = error.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<ConnectionError>(),
            Some(ConnectionError::ModuleLoad { .. })
        )
    });

    if !module_load_failure && !MODULE_PATTERN.is_match(&message) {
        tracing::warn!("Failed to create connection '{}': {}", name, message);
        return ConnectionError::Construction {
            name: name.to_string(),
            message,
        };
    }

    let module = MODULE_PATTERN
        .captures(&message)
        .map(|captures| captures[1].to_string());

    let hint = match module.as_deref().and_then(package_for_module) {
        Some(package) => format!(
            "You need to install the '{}' package to use this connection.",
            package
        ),
        None => "You may be missing a dependency required to use this connection.".to_string(),
    };

    tracing::warn!(
        "Connection '{}' is missing a dependency: {}",
        name,
        module.as_deref().unwrap_or("unknown")
    );

    ConnectionError::DependencyMissing {
        module,
        message,
        hint,
    }
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}
