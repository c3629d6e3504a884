//! Connection trait and connector classes

use super::driver::QueryDriver;
use super::modules::{Export, ModuleLoader};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Keyword configuration for a connection, ordered by key
pub type ConnectionParams = BTreeMap<String, Value>;

/// Upcast to `Any` so shared connections can be recovered as their concrete type
pub trait AsAnyArc {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAnyArc for T {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A live connection handed out by the factory
#[async_trait]
pub trait Connection: AsAnyArc + Send + Sync {
    /// Name the connection was created under
    fn connection_name(&self) -> &str;

    /// Short type name, e.g. "sql"
    fn connection_type(&self) -> &str;

    /// Health check (optional, returns Ok if the data source is reachable)
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Recover the concrete type of a shared connection
pub fn downcast_connection<T: Connection + 'static>(
    connection: Arc<dyn Connection>,
) -> Option<Arc<T>> {
    <dyn Connection as AsAnyArc>::into_any_arc(connection)
        .downcast::<T>()
        .ok()
}

/// A connection type that can be built by the factory
///
/// Implementing this trait is the capability contract for connectors: the
/// type can be constructed from a connection name plus keyword configuration.
#[async_trait]
pub trait Connector: Connection + Sized + 'static {
    /// Fully qualified type path
    ///
    /// Must be unique per connector type. It is what qualified names and
    /// error messages refer to; cache identity also includes the Rust type,
    /// so two connectors sharing a path never share connections.
    const TYPE_PATH: &'static str;

    /// Build a connection
    async fn connect(ctx: ConnectContext) -> Result<Self>;
}

/// Everything a connector needs to build itself
#[derive(Clone)]
pub struct ConnectContext {
    /// Name the connection is requested under
    pub connection_name: String,
    /// Explicit parameters passed by the caller
    pub params: ConnectionParams,
    /// The `connections.<name>` secrets section, minus `type`
    pub secrets: ConnectionParams,
    /// Loader for driver modules
    pub modules: Arc<dyn ModuleLoader>,
}

impl ConnectContext {
    /// Secrets-derived defaults with explicit parameters layered on top
    pub fn merged_params(&self) -> ConnectionParams {
        let mut merged = self.secrets.clone();
        merged.extend(self.params.clone());
        merged
    }

    /// Load the query driver exported as `driver` by `module`
    pub fn driver(&self, module: &str) -> Result<Arc<dyn QueryDriver>> {
        let loaded = self.modules.load(module)?;
        match loaded.attribute("driver")? {
            Export::Driver(driver) => Ok(driver.clone()),
            _ => anyhow::bail!("Module '{}' does not export a query driver", module),
        }
    }
}

impl fmt::Debug for ConnectContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectContext")
            .field("connection_name", &self.connection_name)
            .field("params", &self.params.keys().collect::<Vec<_>>())
            .field("secrets", &self.secrets.keys().collect::<Vec<_>>())
            .finish()
    }
}

type Constructor =
    dyn Fn(ConnectContext) -> BoxFuture<'static, Result<Arc<dyn Connection>>> + Send + Sync;

/// Type-erased connector: its type path plus a constructor
///
/// Only obtainable through [`ConnectorClass::of`], so every class satisfies
/// the [`Connector`] contract.
#[derive(Clone)]
pub struct ConnectorClass {
    type_path: Arc<str>,
    type_id: TypeId,
    constructor: Arc<Constructor>,
}

impl ConnectorClass {
    /// Class for a concrete connector type
    pub fn of<T: Connector>() -> Self {
        Self {
            type_path: Arc::from(T::TYPE_PATH),
            type_id: TypeId::of::<T>(),
            constructor: Arc::new(|ctx| {
                Box::pin(async move {
                    let connection = T::connect(ctx).await?;
                    Ok(Arc::new(connection) as Arc<dyn Connection>)
                })
            }),
        }
    }

    /// Fully qualified type path, used as the type identity
    pub fn type_path(&self) -> &str {
        &self.type_path
    }

    /// Rust type of the connector
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Run the constructor
    pub(crate) fn construct(
        &self,
        ctx: ConnectContext,
    ) -> BoxFuture<'static, Result<Arc<dyn Connection>>> {
        (self.constructor)(ctx)
    }
}

impl PartialEq for ConnectorClass {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.type_path == other.type_path
    }
}

impl Eq for ConnectorClass {}

impl fmt::Debug for ConnectorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectorClass")
            .field(&self.type_path)
            .finish()
    }
}

impl fmt::Display for ConnectorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_path)
    }
}

/// Requested connection type
///
/// `Named` is either a built-in short name ("sql") or a qualified path
/// ("acme.connections.Warehouse"); qualified paths always contain a '.'.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionType {
    Named(String),
    Class(ConnectorClass),
}

impl ConnectionType {
    /// Connection type for a concrete connector
    pub fn of<T: Connector>() -> Self {
        Self::Class(ConnectorClass::of::<T>())
    }
}

impl From<&str> for ConnectionType {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for ConnectionType {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<ConnectorClass> for ConnectionType {
    fn from(class: ConnectorClass) -> Self {
        Self::Class(class)
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Class(class) => f.write_str(class.type_path()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::ModuleCatalog;
    use serde_json::json;

    struct Echo {
        name: String,
        params: ConnectionParams,
    }

    #[async_trait]
    impl Connection for Echo {
        fn connection_name(&self) -> &str {
            &self.name
        }

        fn connection_type(&self) -> &str {
            "echo"
        }
    }

    #[async_trait]
    impl Connector for Echo {
        const TYPE_PATH: &'static str = "tests.Echo";

        async fn connect(ctx: ConnectContext) -> Result<Self> {
            Ok(Self {
                params: ctx.merged_params(),
                name: ctx.connection_name,
            })
        }
    }

    fn context(params: ConnectionParams, secrets: ConnectionParams) -> ConnectContext {
        ConnectContext {
            connection_name: "echo".to_string(),
            params,
            secrets,
            modules: Arc::new(ModuleCatalog::new()),
        }
    }

    #[test]
    fn test_merged_params_prefer_explicit() {
        let secrets = ConnectionParams::from([
            ("host".to_string(), json!("db.internal")),
            ("port".to_string(), json!(5432)),
        ]);
        let params = ConnectionParams::from([("port".to_string(), json!(6543))]);

        let merged = context(params, secrets).merged_params();
        assert_eq!(merged["host"], json!("db.internal"));
        assert_eq!(merged["port"], json!(6543));
    }

    #[tokio::test]
    async fn test_construct_and_downcast() {
        let class = ConnectorClass::of::<Echo>();
        assert_eq!(class.type_path(), "tests.Echo");

        let params = ConnectionParams::from([("a".to_string(), json!(1))]);
        let connection = class
            .construct(context(params, ConnectionParams::new()))
            .await
            .unwrap();
        assert_eq!(connection.connection_type(), "echo");

        let echo = downcast_connection::<Echo>(connection).unwrap();
        assert_eq!(echo.name, "echo");
        assert_eq!(echo.params["a"], json!(1));
    }

    #[test]
    fn test_driver_requires_module() {
        let err = context(ConnectionParams::new(), ConnectionParams::new())
            .driver("sqlx")
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "No module named 'sqlx'");
    }

    /// Distinct connector that reuses `Echo`'s type path
    struct Shadow {
        name: String,
    }

    #[async_trait]
    impl Connection for Shadow {
        fn connection_name(&self) -> &str {
            &self.name
        }

        fn connection_type(&self) -> &str {
            "shadow"
        }
    }

    #[async_trait]
    impl Connector for Shadow {
        const TYPE_PATH: &'static str = "tests.Echo";

        async fn connect(ctx: ConnectContext) -> Result<Self> {
            Ok(Self {
                name: ctx.connection_name,
            })
        }
    }

    #[test]
    fn test_shared_type_path_keeps_types_apart() {
        use crate::connections::ConnectionKey;

        let echo = ConnectorClass::of::<Echo>();
        let shadow = ConnectorClass::of::<Shadow>();
        assert_eq!(echo.type_path(), shadow.type_path());
        assert_ne!(echo, shadow);
        assert_eq!(echo, ConnectorClass::of::<Echo>());

        let params = ConnectionParams::new();
        assert_ne!(
            ConnectionKey::new("db", &echo, &params),
            ConnectionKey::new("db", &shadow, &params)
        );
    }

    #[test]
    fn test_connection_type_display() {
        assert_eq!(ConnectionType::from("sql").to_string(), "sql");
        assert_eq!(ConnectionType::of::<Echo>().to_string(), "tests.Echo");
    }
}
