//! Work site repository.

use super::Query;
use crate::client::BackendClient;
use crate::error::Result;
use crate::models::work::TABLE;
use crate::models::{NewWork, Work};
use crate::session::{AccessScope, SessionContext};

/// Sites the caller may see, by name.
pub async fn list_visible(client: &BackendClient, ctx: &SessionContext) -> Result<Vec<Work>> {
    let query = match ctx.scope() {
        AccessScope::AllSites => Query::select("*"),
        AccessScope::Site(id) => Query::select("*").eq("id", id),
        AccessScope::Denied => return Ok(Vec::new()),
    };
    client.select(ctx.access_token(), TABLE, &query.order_asc("nome")).await
}

/// Create a site. Admin only.
pub async fn create(client: &BackendClient, ctx: &SessionContext, data: &NewWork) -> Result<Work> {
    ctx.require_admin()?;
    let work: Work = client.insert(ctx.access_token(), TABLE, data).await?;
    tracing::info!("Work {} created: {}", work.id, work.name);
    Ok(work)
}
