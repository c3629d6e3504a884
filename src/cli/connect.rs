//! Connect command handler

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use std::sync::Arc;

use crate::config::ConfigLoader;
use crate::connections::{ConnectionFactory, ConnectionParams, ConnectionType, ModuleCatalog};
use crate::secrets::Secrets;
use crate::telemetry::UsageStats;

/// Arguments for `appwire connect`
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Connection name, looked up under `connections.<name>` in secrets
    pub name: String,

    /// Connection type: a built-in short name or a qualified connector path
    #[arg(long = "type")]
    pub connection_type: Option<String>,

    /// Connection parameter as KEY=VALUE (VALUE is parsed as JSON when possible)
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,
}

/// Parse a KEY=VALUE pair
pub fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{}'", raw));
    }

    let value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Create a connection and run its health check
pub async fn handle_connect_command(args: ConnectArgs) -> Result<()> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;

    let secrets = Arc::new(Secrets::new(config.secrets.paths.clone()));
    // Driver modules are registered by the embedding application
    let modules = Arc::new(ModuleCatalog::new());
    let telemetry = Arc::new(UsageStats::new(config.telemetry.gather_usage_stats));
    let factory = ConnectionFactory::new(secrets, modules, telemetry);

    let params: ConnectionParams = args.params.into_iter().collect();
    let connection = factory
        .create(
            &args.name,
            args.connection_type.map(ConnectionType::from),
            params,
        )
        .await?;

    connection
        .health_check()
        .await
        .with_context(|| format!("Health check failed for connection '{}'", args.name))?;

    println!(
        "Connection '{}' ({}) is healthy",
        connection.connection_name(),
        connection.connection_type()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("port=5432").unwrap(),
            ("port".to_string(), Value::from(5432))
        );
        assert_eq!(
            parse_param("host=db.internal").unwrap(),
            ("host".to_string(), Value::from("db.internal"))
        );
        assert_eq!(
            parse_param("query={\"sslmode\":\"require\"}").unwrap().1["sslmode"],
            Value::from("require")
        );
        assert_eq!(
            parse_param("password=a=b").unwrap(),
            ("password".to_string(), Value::from("a=b"))
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }
}
