//! Profile repository.

use chrono::Utc;
use uuid::Uuid;

use super::Query;
use crate::client::BackendClient;
use crate::error::Result;
use crate::models::profile::TABLE;
use crate::models::{Profile, Role, UpdateProfile};
use crate::session::{Session, SessionContext};

/// Profile of the signed-in user, if one exists.
pub async fn get_own(client: &BackendClient, session: &Session) -> Result<Option<Profile>> {
    let query = Query::select("*").eq("id", session.user.id).limit(1);
    let rows: Vec<Profile> = client.select(&session.access_token, TABLE, &query).await?;
    Ok(rows.into_iter().next())
}

/// Session context for a fresh login: the tokens plus the user's profile.
pub async fn load_context(client: &BackendClient, session: Session) -> Result<SessionContext> {
    let profile = get_own(client, &session).await?;
    match &profile {
        Some(p) => tracing::info!("Signed in as {} ({})", p.display_name(), p.role.as_str()),
        None => tracing::warn!("User {} has no profile, access is limited", session.user.id),
    }
    Ok(SessionContext::new(session, profile))
}

/// All profiles, by name. Admin only.
pub async fn list_all(client: &BackendClient, ctx: &SessionContext) -> Result<Vec<Profile>> {
    ctx.require_admin()?;
    let query = Query::select("*").order_asc("nome_completo");
    client.select(ctx.access_token(), TABLE, &query).await
}

/// Change a user's role and assigned work. Admin only.
pub async fn assign(
    client: &BackendClient,
    ctx: &SessionContext,
    user_id: Uuid,
    role: Role,
    work_id: Option<i64>,
) -> Result<Option<Profile>> {
    ctx.require_admin()?;
    let data = UpdateProfile {
        role,
        work_id,
        updated_at: Utc::now(),
    };
    let query = Query::new().eq("id", user_id);
    let rows: Vec<Profile> = client.update(ctx.access_token(), TABLE, &query, &data).await?;
    tracing::info!("Profile {user_id} set to {} at site {:?}", role.as_str(), work_id);
    Ok(rows.into_iter().next())
}
