//! Query driver seam used by the built-in connectors

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A single result row, column name to value
pub type Row = Map<String, Value>;

/// Executes statements against a data source
///
/// Drivers are published by the embedding application as module exports
/// (see [`ModuleCatalog`](super::ModuleCatalog)). A built-in connector whose
/// driver module is absent fails to construct with a missing-module error.
#[async_trait]
pub trait QueryDriver: Send + Sync {
    /// Driver name, used in logs
    fn name(&self) -> &str;

    /// Run `statement` against the data source identified by `target`
    async fn query(&self, target: &str, statement: &str) -> Result<Vec<Row>>;
}
