//! Connector registry
//!
//! Maps connection types to connector classes. Short names resolve against
//! the fixed built-in table; qualified names go through the module loader.
//!
//! To add a built-in connector:
//! 1. Implement [`Connector`](super::Connector) for it in builtin.rs
//! 2. Add an entry to [`BUILTIN_CONNECTORS`]
//! 3. Add a typed helper to [`ConnectionFactory`](super::ConnectionFactory)

use super::builtin::{SnowparkConnection, SqlConnection};
use super::connector::{ConnectionType, ConnectorClass};
use super::modules::ModuleLoader;
use super::{ConnectionError, ConnectionResult};
use std::sync::Arc;

/// Registry entry for a built-in connector
pub struct BuiltinConnector {
    pub short_name: &'static str,
    pub class: fn() -> ConnectorClass,
}

/// Built-in connectors, short names must be unique
pub const BUILTIN_CONNECTORS: &[BuiltinConnector] = &[
    BuiltinConnector {
        short_name: "snowpark",
        class: ConnectorClass::of::<SnowparkConnection>,
    },
    BuiltinConnector {
        short_name: "sql",
        class: ConnectorClass::of::<SqlConnection>,
    },
];

/// Resolves connection types to connector classes
#[derive(Clone)]
pub struct ConnectorRegistry {
    modules: Arc<dyn ModuleLoader>,
}

impl ConnectorRegistry {
    /// Create a registry resolving qualified names through `modules`
    pub fn new(modules: Arc<dyn ModuleLoader>) -> Self {
        Self { modules }
    }

    /// Loader used for qualified names
    pub fn modules(&self) -> Arc<dyn ModuleLoader> {
        self.modules.clone()
    }

    /// Supported built-in short names
    pub fn supported_types() -> Vec<String> {
        BUILTIN_CONNECTORS
            .iter()
            .map(|entry| entry.short_name.to_string())
            .collect()
    }

    /// Look up a built-in connector by short name
    pub fn builtin(short_name: &str) -> ConnectionResult<ConnectorClass> {
        BUILTIN_CONNECTORS
            .iter()
            .find(|entry| entry.short_name == short_name)
            .map(|entry| (entry.class)())
            .ok_or_else(|| ConnectionError::UnsupportedConnectionType {
                requested: short_name.to_string(),
                supported: Self::supported_types(),
            })
    }

    /// Resolve a connection type to a connector class
    pub fn resolve(&self, connection_type: &ConnectionType) -> ConnectionResult<ConnectorClass> {
        match connection_type {
            ConnectionType::Class(class) => Ok(class.clone()),
            ConnectionType::Named(name) => match name.rsplit_once('.') {
                Some((module_path, class_name)) => {
                    tracing::debug!(
                        "Resolving connector '{}' from module '{}'",
                        class_name,
                        module_path
                    );
                    let module = self.modules.load(module_path)?;
                    module.connector_class(class_name)
                }
                None => Self::builtin(name),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::{Connector, Export, Module, ModuleCatalog};
    use serde_json::json;
    use std::collections::HashSet;

    fn registry(catalog: ModuleCatalog) -> ConnectorRegistry {
        ConnectorRegistry::new(Arc::new(catalog))
    }

    #[test]
    fn test_builtin_names_unique() {
        let names: HashSet<_> = BUILTIN_CONNECTORS.iter().map(|e| e.short_name).collect();
        assert_eq!(names.len(), BUILTIN_CONNECTORS.len());
    }

    #[test]
    fn test_resolve_builtins() {
        let registry = registry(ModuleCatalog::new());

        let sql = registry.resolve(&"sql".into()).unwrap();
        assert_eq!(sql.type_path(), SqlConnection::TYPE_PATH);

        let snowpark = registry.resolve(&"snowpark".into()).unwrap();
        assert_eq!(snowpark.type_path(), SnowparkConnection::TYPE_PATH);
    }

    #[test]
    fn test_unsupported_type_lists_supported() {
        let registry = registry(ModuleCatalog::new());
        let err = registry.resolve(&"mongo".into()).unwrap_err();

        insta::assert_snapshot!(
            err.to_string(),
            @"Invalid connection 'mongo'. Supported connection types: snowpark, sql"
        );
    }

    #[test]
    fn test_resolve_qualified_name() {
        let catalog = ModuleCatalog::new().with_module(
            Module::new("acme.connections").export_connector::<SqlConnection>("Warehouse"),
        );
        let class = registry(catalog)
            .resolve(&"acme.connections.Warehouse".into())
            .unwrap();
        assert_eq!(class, ConnectorClass::of::<SqlConnection>());
    }

    #[test]
    fn test_resolve_qualified_name_errors() {
        let catalog = ModuleCatalog::new().with_module(
            Module::new("acme.connections").export("VERSION", Export::Value(json!("1.0"))),
        );
        let registry = registry(catalog);

        assert!(matches!(
            registry.resolve(&"missing.module.Conn".into()),
            Err(ConnectionError::ModuleLoad { ref module }) if module == "missing.module"
        ));
        assert!(matches!(
            registry.resolve(&"acme.connections.Missing".into()),
            Err(ConnectionError::AttributeLoad { .. })
        ));
        assert!(matches!(
            registry.resolve(&"acme.connections.VERSION".into()),
            Err(ConnectionError::InvalidConnectionClass { .. })
        ));
    }

    #[test]
    fn test_class_reference_passes_through() {
        let registry = registry(ModuleCatalog::new());
        let class = registry
            .resolve(&ConnectionType::of::<SnowparkConnection>())
            .unwrap();
        assert_eq!(class.type_path(), SnowparkConnection::TYPE_PATH);
    }
}
