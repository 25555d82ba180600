//! Hosted backend HTTP client (identity service + table REST API).

use chrono::{DateTime, Duration, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_RANGE, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::BackendConfig;
use crate::db::Query;
use crate::error::{AppError, Result};
use crate::session::{AuthUser, Session};

/// Lifetime assumed when the token response carries no expiry.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Backend client.
///
/// Holds the project URL and the public API key; every call that reads or
/// writes tables takes the access token of the signed-in user.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    anon_key: String,
}

/// Result of a sign-up request.
#[derive(Debug)]
pub enum SignUpOutcome {
    /// Account confirmed immediately.
    SignedIn(Session),
    /// A confirmation e-mail was sent.
    ConfirmationSent,
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(|| now + Duration::seconds(self.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)));

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

impl BackendClient {
    /// Create a client for the configured project.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{base}/auth/v1/{path}", base = self.base_url)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{base}/rest/v1/{table}", base = self.base_url)
    }

    fn with_token(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
    }

    // ----- identity -----

    /// Sign in with e-mail and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::validation("Preencha e-mail e senha."));
        }

        let response = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let token: TokenResponse = check(response).await?.json().await?;
        tracing::info!("Signed in as {email}");
        Ok(token.into_session(Utc::now()))
    }

    /// Create an account.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::validation("Preencha e-mail e senha."));
        }

        let response = self
            .http
            .post(self.auth_url("signup"))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let body: Value = check(response).await?.json().await?;
        if body.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(body)?;
            tracing::info!("Account created and signed in: {email}");
            Ok(SignUpOutcome::SignedIn(token.into_session(Utc::now())))
        } else {
            tracing::info!("Account created, confirmation sent to {email}");
            Ok(SignUpOutcome::ConfirmationSent)
        }
    }

    /// Exchange a refresh token for a new session.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let response = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let response = match check(response).await {
            Err(AppError::Backend { status, .. }) if status == 400 || status == 401 => {
                return Err(AppError::Unauthorized);
            }
            other => other?,
        };

        let token: TokenResponse = response.json().await?;
        tracing::debug!("Session refreshed");
        Ok(token.into_session(Utc::now()))
    }

    /// Revoke the session on the server.
    pub async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .with_token(self.http.post(self.auth_url("logout")), access_token)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Check that the identity service answers with this API key.
    pub async fn health(&self) -> Result<()> {
        let response = self
            .http
            .get(self.auth_url("health"))
            .header("apikey", &self.anon_key)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    // ----- tables -----

    /// Rows of `table` matching `query`.
    pub async fn select<T: DeserializeOwned>(&self, access_token: &str, table: &str, query: &Query) -> Result<Vec<T>> {
        let response = self
            .with_token(self.http.get(self.rest_url(table)), access_token)
            .query(query.params())
            .send()
            .await?;
        Ok(check_table(response).await?.json().await?)
    }

    /// Insert one row and return it as stored.
    pub async fn insert<B: Serialize, T: DeserializeOwned>(&self, access_token: &str, table: &str, body: &B) -> Result<T> {
        let response = self
            .with_token(self.http.post(self.rest_url(table)), access_token)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;

        let rows: Vec<T> = check_table(response).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(format!("{table}: insert returned no row")))
    }

    /// Patch the rows matching `query`; returns the updated rows.
    pub async fn update<B: Serialize, T: DeserializeOwned>(
        &self,
        access_token: &str,
        table: &str,
        query: &Query,
        body: &B,
    ) -> Result<Vec<T>> {
        let response = self
            .with_token(self.http.patch(self.rest_url(table)), access_token)
            .header("Prefer", "return=representation")
            .query(query.params())
            .json(body)
            .send()
            .await?;
        Ok(check_table(response).await?.json().await?)
    }

    /// Exact row count of `table` visible to the token.
    pub async fn count(&self, access_token: &str, table: &str, query: &Query) -> Result<u64> {
        let response = self
            .with_token(self.http.get(self.rest_url(table)), access_token)
            .header("Prefer", "count=exact")
            .query(query.params())
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await?;

        let response = check_table(response).await?;
        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(parse_content_range_total)
            .ok_or_else(|| AppError::not_found(format!("{table}: missing row count")))
    }
}

/// Total from a `Content-Range: 0-0/42` (or `*/0`) header.
fn parse_content_range_total(value: &HeaderValue) -> Option<u64> {
    value.to_str().ok()?.rsplit('/').next()?.trim().parse().ok()
}

/// Pass successful responses through, turn the rest into `AppError::Backend`.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    let err = backend_error(status, &body);
    tracing::warn!("Backend {status} on {url}: {err}");
    Err(err)
}

/// Like [`check`], for calls made with the user's token: a rejected or
/// expired token becomes `Unauthorized`, a row-level-security refusal
/// becomes `Forbidden`.
async fn check_table(response: Response) -> Result<Response> {
    match check(response).await {
        Err(AppError::Backend { status: 401, .. }) => Err(AppError::Unauthorized),
        Err(AppError::Backend { status: 403, message, .. }) => Err(AppError::forbidden(message)),
        other => other,
    }
}

/// Read the error body shapes of both services.
///
/// Identity errors use `msg`/`error_description`/`error_code` (older
/// releases `error`), table errors use `message`/`code`.
pub(crate) fn backend_error(status: StatusCode, body: &str) -> AppError {
    let json: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let text = |key: &str| json.get(key).and_then(Value::as_str).map(str::to_string);

    let message = text("message")
        .or_else(|| text("msg"))
        .or_else(|| text("error_description"))
        .or_else(|| text("error"))
        .or_else(|| (!body.trim().is_empty() && json.is_null()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Erro desconhecido").to_string());

    let code = text("error_code")
        .or_else(|| match json.get("code") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .or_else(|| text("error_description").and(text("error")));

    AppError::Backend {
        status: status.as_u16(),
        code,
        message,
    }
}
