//! Delivery repository.

use chrono::{DateTime, Utc};

use super::{scoped_read, scoped_write};
use crate::client::BackendClient;
use crate::error::{AppError, Result};
use crate::models::delivery::{LIST_COLUMNS, PHOTO_COLUMNS, TABLE};
use crate::models::{Delivery, DeliveryPhotos, NewDelivery, UpdateDelivery};
use crate::session::SessionContext;

/// Visible deliveries, newest first, without photos.
pub async fn list_all(client: &BackendClient, ctx: &SessionContext) -> Result<Vec<Delivery>> {
    let Some(query) = scoped_read(ctx, LIST_COLUMNS) else {
        return Ok(Vec::new());
    };
    client.select(ctx.access_token(), TABLE, &query.order_desc("entrada")).await
}

/// Deliveries whose vehicle is still on site.
pub async fn list_active(client: &BackendClient, ctx: &SessionContext) -> Result<Vec<Delivery>> {
    let Some(query) = scoped_read(ctx, LIST_COLUMNS) else {
        return Ok(Vec::new());
    };
    let query = query.is_null("saida").order_desc("entrada");
    client.select(ctx.access_token(), TABLE, &query).await
}

pub async fn list_since(client: &BackendClient, ctx: &SessionContext, since: DateTime<Utc>) -> Result<Vec<Delivery>> {
    let Some(query) = scoped_read(ctx, LIST_COLUMNS) else {
        return Ok(Vec::new());
    };
    let query = query.gte("entrada", since.to_rfc3339()).order_desc("entrada");
    client.select(ctx.access_token(), TABLE, &query).await
}

pub async fn get_photos(client: &BackendClient, ctx: &SessionContext, id: i64) -> Result<DeliveryPhotos> {
    let query = scoped_write(ctx, PHOTO_COLUMNS)?.eq("id", id);
    let rows: Vec<DeliveryPhotos> = client.select(ctx.access_token(), TABLE, &query).await?;
    rows.into_iter()
        .next()
        .ok_or_else(|| AppError::not_found(format!("entrega {id}")))
}

pub async fn insert(client: &BackendClient, ctx: &SessionContext, data: &NewDelivery) -> Result<Delivery> {
    ctx.scope().check_write(data.work_id)?;
    let delivery: Delivery = client.insert(ctx.access_token(), TABLE, data).await?;
    tracing::info!("Delivery {} registered at site {}", delivery.id, delivery.work_id);
    Ok(delivery)
}

/// Set the exit time of an active delivery; `None` if it already left.
pub async fn mark_exit(
    client: &BackendClient,
    ctx: &SessionContext,
    id: i64,
    at: DateTime<Utc>,
) -> Result<Option<Delivery>> {
    let query = scoped_write(ctx, LIST_COLUMNS)?.eq("id", id).is_null("saida");
    let body = serde_json::json!({ "saida": at });
    let rows: Vec<Delivery> = client.update(ctx.access_token(), TABLE, &query, &body).await?;

    let updated = rows.into_iter().next();
    match &updated {
        Some(_) => tracing::info!("Delivery {id} exit registered"),
        None => tracing::warn!("Delivery {id} exit skipped: already exited or not visible"),
    }
    Ok(updated)
}

pub async fn update(
    client: &BackendClient,
    ctx: &SessionContext,
    id: i64,
    data: &UpdateDelivery,
) -> Result<Option<Delivery>> {
    if data.is_empty() {
        return Ok(None);
    }
    let query = scoped_write(ctx, LIST_COLUMNS)?.eq("id", id);
    let rows: Vec<Delivery> = client.update(ctx.access_token(), TABLE, &query, data).await?;
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

    #[tokio::test]
    async fn test_insert_for_other_site_is_forbidden() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", Matcher::Any).expect(0).create_async().await;

        let draft = NewDelivery {
            work_id: 9,
            user_id: uuid::Uuid::nil(),
            supplier: "AREIA LTDA".to_string(),
            driver_name: "JOSE".to_string(),
            driver_document: "12.345.678-9".to_string(),
            invoice_number: "123".to_string(),
            license_plate: "ABC1234".to_string(),
            invoice_photo: "data:image/jpeg;base64,AA".to_string(),
            plate_photo: "data:image/jpeg;base64,BB".to_string(),
            entry_time: Utc::now(),
        };

        let err = insert(&client_for(&server.url()), &context(Role::Guard, Some(2)), &draft)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_photos() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/entregas")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("select".into(), PHOTO_COLUMNS.into()),
                Matcher::UrlEncoded("id".into(), "eq.5".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"foto_nota": "data:image/jpeg;base64,AA", "foto_placa": null}]"#)
            .create_async()
            .await;

        let photos = get_photos(&client_for(&server.url()), &context(Role::Admin, None), 5)
            .await
            .unwrap();
        assert!(photos.invoice_photo.is_some());
        assert!(photos.plate_photo.is_none());
    }

    #[tokio::test]
    async fn test_get_photos_missing_row() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/entregas")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let err = get_photos(&client_for(&server.url()), &context(Role::Admin, None), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
