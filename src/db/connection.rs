//! Backend reachability and table statistics.

use super::Query;
use crate::client::BackendClient;
use crate::config::BackendConfig;
use crate::error::Result;
use crate::models::{delivery, visitor, work};
use crate::session::SessionContext;

/// Test a backend configuration without keeping the client.
pub async fn test_connection(config: &BackendConfig) -> Result<()> {
    let client = BackendClient::new(config)?;
    client.health().await
}

/// Get record counts for all gate tables visible to the caller.
pub async fn get_table_counts(client: &BackendClient, ctx: &SessionContext) -> Result<TableCounts> {
    let token = ctx.access_token();
    let site = ctx.scope().site_filter();

    let works = client.count(token, work::TABLE, &Query::new()).await?;
    let visitors = client.count(token, visitor::TABLE, &Query::new().site(site)).await?;
    let deliveries = client.count(token, delivery::TABLE, &Query::new().site(site)).await?;

    Ok(TableCounts {
        works,
        visitors,
        deliveries,
    })
}

/// Table record counts.
#[derive(Debug, Clone, Default)]
pub struct TableCounts {
    pub works: u64,
    pub visitors: u64,
    pub deliveries: u64,
}
