//! Built-in connectors
//!
//! Both connectors take their configuration from explicit parameters layered
//! over the `connections.<name>` secrets section, and run statements through a
//! query driver published by a driver module.

use super::connector::{ConnectContext, Connection, ConnectionParams, Connector};
use super::driver::{QueryDriver, Row};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Driver module required by [`SqlConnection`]
pub const SQL_DRIVER_MODULE: &str = "sqlx";

/// Driver module required by [`SnowparkConnection`]
pub const SNOWPARK_DRIVER_MODULE: &str = "snowflake.snowpark";

const SQL_REQUIRED_PARAMS: &[&str] = &["dialect", "username", "host"];
const SNOWPARK_REQUIRED_PARAMS: &[&str] = &["account", "user"];

/// Render a scalar parameter as a string
fn param_string(params: &ConnectionParams, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn require_params(params: &ConnectionParams, required: &[&str], kind: &str) -> Result<()> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|key| param_string(params, key).is_none())
        .collect();

    if !missing.is_empty() {
        anyhow::bail!(
            "Missing {} connection configuration: {}. Did you forget to set this in secrets.toml or as connection parameters?",
            kind,
            missing.join(", ")
        );
    }
    Ok(())
}

/// URL with the password masked
fn redacted(url: &Url) -> String {
    let mut masked = url.clone();
    if masked.password().is_some() {
        let _ = masked.set_password(Some("***"));
    }
    masked.to_string()
}

fn set_credentials(url: &mut Url, username: Option<&str>, password: Option<&str>) -> Result<()> {
    if let Some(username) = username {
        url.set_username(username)
            .map_err(|_| anyhow::anyhow!("Invalid username for connection url"))?;
    }
    if let Some(password) = password {
        url.set_password(Some(password))
            .map_err(|_| anyhow::anyhow!("Invalid password for connection url"))?;
    }
    Ok(())
}

/// SQL database connection
pub struct SqlConnection {
    name: String,
    url: Url,
    autocommit: bool,
    driver: Arc<dyn QueryDriver>,
}

impl SqlConnection {
    /// Build the database url from `url`, or from its individual parts
    pub fn build_url(params: &ConnectionParams) -> Result<Url> {
        if let Some(url) = params.get("url") {
            let url = url.as_str().context("`url` must be a string")?;
            return Url::parse(url).context("Invalid database url");
        }

        require_params(params, SQL_REQUIRED_PARAMS, "SQL DB")?;

        let dialect = param_string(params, "dialect").unwrap_or_default();
        let scheme = match param_string(params, "driver") {
            Some(driver) => format!("{}+{}", dialect, driver),
            None => dialect,
        };

        let mut url = Url::parse(&format!("{}://", scheme))
            .with_context(|| format!("Invalid dialect: {}", scheme))?;

        let host = param_string(params, "host").unwrap_or_default();
        url.set_host(Some(&host))
            .with_context(|| format!("Invalid host: {}", host))?;

        if let Some(port) = param_string(params, "port") {
            let port: u16 = port
                .parse()
                .with_context(|| format!("Invalid port: {}", port))?;
            url.set_port(Some(port))
                .map_err(|_| anyhow::anyhow!("Invalid port for connection url"))?;
        }

        set_credentials(
            &mut url,
            param_string(params, "username").as_deref(),
            param_string(params, "password").as_deref(),
        )?;

        if let Some(database) = param_string(params, "database") {
            url.set_path(&format!("/{}", database.trim_start_matches('/')));
        }

        if let Some(Value::Object(query)) = params.get("query") {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                match value {
                    Value::String(s) => pairs.append_pair(key, s),
                    other => pairs.append_pair(key, &other.to_string()),
                };
            }
        }

        Ok(url)
    }

    /// Database dialect, e.g. "postgresql"
    pub fn dialect(&self) -> &str {
        self.url
            .scheme()
            .split('+')
            .next()
            .unwrap_or_else(|| self.url.scheme())
    }

    /// Whether statements are committed automatically
    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    /// Database url with the password masked
    pub fn url(&self) -> String {
        redacted(&self.url)
    }

    /// Run a statement and collect its rows
    pub async fn query(&self, statement: &str) -> Result<Vec<Row>> {
        tracing::debug!(
            "Running query on '{}' via {}",
            self.name,
            self.driver.name()
        );

        self.driver
            .query(self.url.as_str(), statement)
            .await
            .with_context(|| format!("Query failed on connection '{}'", self.name))
    }
}

impl fmt::Debug for SqlConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlConnection")
            .field("name", &self.name)
            .field("url", &self.url())
            .field("autocommit", &self.autocommit)
            .finish()
    }
}

#[async_trait]
impl Connection for SqlConnection {
    fn connection_name(&self) -> &str {
        &self.name
    }

    fn connection_type(&self) -> &str {
        "sql"
    }

    async fn health_check(&self) -> Result<()> {
        self.query("SELECT 1").await.map(|_| ())
    }
}

#[async_trait]
impl Connector for SqlConnection {
    const TYPE_PATH: &'static str = "appwire.connections.SqlConnection";

    async fn connect(ctx: ConnectContext) -> Result<Self> {
        let driver = ctx.driver(SQL_DRIVER_MODULE)?;
        let params = ctx.merged_params();
        let url = Self::build_url(&params)?;
        let autocommit = params
            .get("autocommit")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        tracing::debug!(
            "Created SQL connection '{}' for {}",
            ctx.connection_name,
            redacted(&url)
        );

        Ok(Self {
            name: ctx.connection_name,
            url,
            autocommit,
            driver,
        })
    }
}

/// Snowflake Snowpark connection
pub struct SnowparkConnection {
    name: String,
    target: Url,
    warehouse: Option<String>,
    driver: Arc<dyn QueryDriver>,
}

impl SnowparkConnection {
    /// Build the session target from account, user and optional scoping params
    pub fn build_target(params: &ConnectionParams) -> Result<Url> {
        require_params(params, SNOWPARK_REQUIRED_PARAMS, "Snowpark")?;

        let account = param_string(params, "account").unwrap_or_default();
        let mut target = Url::parse("snowflake://").context("Invalid Snowpark url")?;
        target
            .set_host(Some(&account))
            .with_context(|| format!("Invalid account: {}", account))?;

        set_credentials(
            &mut target,
            param_string(params, "user").as_deref(),
            param_string(params, "password").as_deref(),
        )?;

        match (
            param_string(params, "database"),
            param_string(params, "schema"),
        ) {
            (Some(database), Some(schema)) => {
                target.set_path(&format!("/{}/{}", database, schema));
            }
            (Some(database), None) => target.set_path(&format!("/{}", database)),
            (None, Some(schema)) => anyhow::bail!(
                "Snowpark schema '{}' is set without a database. Set `database` in secrets.toml or as a connection parameter.",
                schema
            ),
            (None, None) => {}
        }

        for key in ["warehouse", "role"] {
            if let Some(value) = param_string(params, key) {
                target.query_pairs_mut().append_pair(key, &value);
            }
        }

        Ok(target)
    }

    /// Warehouse statements run in, if set
    pub fn warehouse(&self) -> Option<&str> {
        self.warehouse.as_deref()
    }

    /// Session target with the password masked
    pub fn target(&self) -> String {
        redacted(&self.target)
    }

    /// Run a statement and collect its rows
    pub async fn query(&self, statement: &str) -> Result<Vec<Row>> {
        tracing::debug!(
            "Running Snowpark query on '{}' via {}",
            self.name,
            self.driver.name()
        );

        self.driver
            .query(self.target.as_str(), statement)
            .await
            .with_context(|| format!("Query failed on connection '{}'", self.name))
    }
}

impl fmt::Debug for SnowparkConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowparkConnection")
            .field("name", &self.name)
            .field("target", &self.target())
            .finish()
    }
}

#[async_trait]
impl Connection for SnowparkConnection {
    fn connection_name(&self) -> &str {
        &self.name
    }

    fn connection_type(&self) -> &str {
        "snowpark"
    }
}

#[async_trait]
impl Connector for SnowparkConnection {
    const TYPE_PATH: &'static str = "appwire.connections.SnowparkConnection";

    async fn connect(ctx: ConnectContext) -> Result<Self> {
        let driver = ctx.driver(SNOWPARK_DRIVER_MODULE)?;
        let params = ctx.merged_params();
        let target = Self::build_target(&params)?;

        tracing::debug!(
            "Created Snowpark connection '{}' for {}",
            ctx.connection_name,
            redacted(&target)
        );

        Ok(Self {
            name: ctx.connection_name,
            target,
            warehouse: param_string(&params, "warehouse"),
            driver,
        })
    }
}
