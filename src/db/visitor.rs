//! Visitor repository.

use chrono::{DateTime, Utc};

use super::{scoped_read, scoped_write};
use crate::client::BackendClient;
use crate::error::{AppError, Result};
use crate::models::visitor::{LIST_COLUMNS, PHOTO_COLUMNS, TABLE};
use crate::models::{NewVisitor, UpdateVisitor, Visitor, VisitorPhotos};
use crate::session::SessionContext;

/// Visible visitors, newest first. Photo columns are not fetched.
pub async fn list_all(client: &BackendClient, ctx: &SessionContext) -> Result<Vec<Visitor>> {
    let Some(query) = scoped_read(ctx, LIST_COLUMNS) else {
        return Ok(Vec::new());
    };
    client.select(ctx.access_token(), TABLE, &query.order_desc("entrada")).await
}

/// Visitors still on site.
pub async fn list_active(client: &BackendClient, ctx: &SessionContext) -> Result<Vec<Visitor>> {
    let Some(query) = scoped_read(ctx, LIST_COLUMNS) else {
        return Ok(Vec::new());
    };
    let query = query.is_null("saida").order_desc("entrada");
    client.select(ctx.access_token(), TABLE, &query).await
}

/// Visitors that entered at or after `since`.
pub async fn list_since(client: &BackendClient, ctx: &SessionContext, since: DateTime<Utc>) -> Result<Vec<Visitor>> {
    let Some(query) = scoped_read(ctx, LIST_COLUMNS) else {
        return Ok(Vec::new());
    };
    let query = query.gte("entrada", since.to_rfc3339()).order_desc("entrada");
    client.select(ctx.access_token(), TABLE, &query).await
}

/// Photos of one visitor.
pub async fn get_photos(client: &BackendClient, ctx: &SessionContext, id: i64) -> Result<VisitorPhotos> {
    let query = scoped_write(ctx, PHOTO_COLUMNS)?.eq("id", id);
    let rows: Vec<VisitorPhotos> = client.select(ctx.access_token(), TABLE, &query).await?;
    rows.into_iter()
        .next()
        .ok_or_else(|| AppError::not_found(format!("visitante {id}")))
}

/// Register an entry.
pub async fn insert(client: &BackendClient, ctx: &SessionContext, data: &NewVisitor) -> Result<Visitor> {
    ctx.scope().check_write(data.work_id)?;
    let visitor: Visitor = client.insert(ctx.access_token(), TABLE, data).await?;
    tracing::info!("Visitor {} registered at site {}", visitor.id, visitor.work_id);
    Ok(visitor)
}

/// Set the exit time of an active visitor.
///
/// Returns `None` when the record already had an exit (the stored time is
/// left untouched) or is not visible.
pub async fn mark_exit(
    client: &BackendClient,
    ctx: &SessionContext,
    id: i64,
    at: DateTime<Utc>,
) -> Result<Option<Visitor>> {
    let query = scoped_write(ctx, LIST_COLUMNS)?.eq("id", id).is_null("saida");
    let body = serde_json::json!({ "saida": at });
    let rows: Vec<Visitor> = client.update(ctx.access_token(), TABLE, &query, &body).await?;

    let updated = rows.into_iter().next();
    match &updated {
        Some(_) => tracing::info!("Visitor {id} exit registered"),
        None => tracing::warn!("Visitor {id} exit skipped: already exited or not visible"),
    }
    Ok(updated)
}

/// Edit a past record. Exit time is never part of the patch.
pub async fn update(
    client: &BackendClient,
    ctx: &SessionContext,
    id: i64,
    data: &UpdateVisitor,
) -> Result<Option<Visitor>> {
    if data.is_empty() {
        return Ok(None);
    }
    let query = scoped_write(ctx, LIST_COLUMNS)?.eq("id", id);
    let rows: Vec<Visitor> = client.update(ctx.access_token(), TABLE, &query, data).await?;
    Ok(rows.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::models::Role;
    use crate::session::tests::context;
    use mockito::Matcher;

    fn client_for(url: &str) -> BackendClient {
        BackendClient::new(&BackendConfig {
            url: url.to_string(),
            anon_key: "anon".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    const ROW: &str = r#"{
        "id": 10, "obra_id": 2, "usuario_id": null, "nome": "ANA", "documento": "12.345.678-9",
        "empresa": "ACME", "motivo_visita": "VISITA", "pessoa_visitada": "PEDRO",
        "capacete": true, "botas": true, "oculos": false,
        "veiculo_modelo": "", "veiculo_cor": "", "veiculo_placa": "",
        "entrada": "2026-10-15T08:00:00+00:00", "saida": null
    }"#;

    #[tokio::test]
    async fn test_unassigned_guard_gets_nothing_without_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", Matcher::Any).expect(0).create_async().await;
        let client = client_for(&server.url());
        let ctx = context(Role::Guard, None);

        assert!(list_all(&client, &ctx).await.unwrap().is_empty());
        assert!(list_active(&client, &ctx).await.unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_assigned_guard_query_is_site_filtered() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/visitantes")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("obra_id".into(), "eq.2".into()),
                Matcher::UrlEncoded("saida".into(), "is.null".into()),
                Matcher::UrlEncoded("select".into(), LIST_COLUMNS.into()),
            ]))
            .with_status(200)
            .with_body(format!("[{ROW}]"))
            .create_async()
            .await;

        let rows = list_active(&client_for(&server.url()), &context(Role::Guard, Some(2)))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "ANA");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_admin_query_is_unfiltered() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/visitantes")
            .match_query(Matcher::Regex("^select=[^&]+&order=entrada.desc$".into()))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        list_all(&client_for(&server.url()), &context(Role::Admin, None)).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_mark_exit_only_patches_active_rows() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/rest/v1/visitantes")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("id".into(), "eq.10".into()),
                Matcher::UrlEncoded("saida".into(), "is.null".into()),
            ]))
            .match_body(Matcher::Regex("\"saida\":\"2026-10-15T12:00:00Z\"".into()))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let at = "2026-10-15T12:00:00Z".parse().unwrap();
        let result = mark_exit(&client_for(&server.url()), &context(Role::Guard, Some(2)), 10, at)
            .await
            .unwrap();
        assert!(result.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_writes_denied_without_site() {
        let server = mockito::Server::new_async().await;
        let client = client_for(&server.url());
        let ctx = context(Role::Guard, None);

        let err = mark_exit(&client, &ctx, 1, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = get_photos(&client, &ctx, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_empty_update_skips_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("PATCH", Matcher::Any).expect(0).create_async().await;

        let result = update(
            &client_for(&server.url()),
            &context(Role::Admin, None),
            10,
            &UpdateVisitor::default(),
        )
        .await
        .unwrap();
        assert!(result.is_none());
        mock.assert_async().await;
    }
}
