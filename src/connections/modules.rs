//! Module catalog
//!
//! Resolves fully-qualified connector names (`module.path.ClassName`) and
//! driver modules. Modules are registered by the embedding application at
//! startup; nothing is loaded from disk.

use super::connector::{Connector, ConnectorClass};
use super::driver::QueryDriver;
use super::{ConnectionError, ConnectionResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A named value exported by a module
#[derive(Clone)]
pub enum Export {
    /// A connector class usable as a connection type
    Connector(ConnectorClass),
    /// A query driver used by connectors
    Driver(Arc<dyn QueryDriver>),
    /// Any other value
    Value(serde_json::Value),
}

impl Export {
    fn kind(&self) -> &'static str {
        match self {
            Self::Connector(_) => "connector class",
            Self::Driver(_) => "query driver",
            Self::Value(_) => "value",
        }
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connector(class) => write!(f, "Connector({})", class),
            Self::Driver(driver) => write!(f, "Driver({})", driver.name()),
            Self::Value(value) => write!(f, "Value({})", value),
        }
    }
}

/// A module: a dotted path and its exports
#[derive(Debug, Clone)]
pub struct Module {
    path: String,
    exports: HashMap<String, Export>,
}

impl Module {
    /// Create an empty module
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            exports: HashMap::new(),
        }
    }

    /// Export a value under `name`
    pub fn export(mut self, name: impl Into<String>, export: Export) -> Self {
        self.exports.insert(name.into(), export);
        self
    }

    /// Export a connector class under `name`
    pub fn export_connector<T: Connector>(self, name: impl Into<String>) -> Self {
        self.export(name, Export::Connector(ConnectorClass::of::<T>()))
    }

    /// Export a query driver as `driver`
    pub fn export_driver(self, driver: Arc<dyn QueryDriver>) -> Self {
        self.export("driver", Export::Driver(driver))
    }

    /// Dotted module path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Look up an exported attribute
    pub fn attribute(&self, name: &str) -> ConnectionResult<&Export> {
        self.exports
            .get(name)
            .ok_or_else(|| ConnectionError::AttributeLoad {
                module: self.path.clone(),
                attribute: name.to_string(),
            })
    }

    /// Look up an exported attribute that must be a connector class
    pub fn connector_class(&self, name: &str) -> ConnectionResult<ConnectorClass> {
        match self.attribute(name)? {
            Export::Connector(class) => Ok(class.clone()),
            other => Err(ConnectionError::InvalidConnectionClass {
                class: format!("{}.{}", self.path, name),
                reason: format!("found a {}", other.kind()),
            }),
        }
    }
}

/// Loads modules by dotted path
pub trait ModuleLoader: Send + Sync {
    /// Load a module, failing with [`ConnectionError::ModuleLoad`] if unknown
    fn load(&self, path: &str) -> ConnectionResult<Arc<Module>>;
}

/// In-process module catalog
#[derive(Debug, Default)]
pub struct ModuleCatalog {
    modules: HashMap<String, Arc<Module>>,
}

impl ModuleCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Register a module, replacing any module with the same path
    pub fn register(&mut self, module: Module) {
        tracing::debug!("Registering module: {}", module.path());
        self.modules
            .insert(module.path().to_string(), Arc::new(module));
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_module(mut self, module: Module) -> Self {
        self.register(module);
        self
    }

    /// Check if a module is registered
    pub fn contains(&self, path: &str) -> bool {
        self.modules.contains_key(path)
    }

    /// Registered module paths
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.modules.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl ModuleLoader for ModuleCatalog {
    fn load(&self, path: &str) -> ConnectionResult<Arc<Module>> {
        self.modules
            .get(path)
            .cloned()
            .ok_or_else(|| ConnectionError::ModuleLoad {
                module: path.to_string(),
            })
    }
}
