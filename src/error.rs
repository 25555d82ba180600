//! Error types and handling.

use thiserror::Error;

use crate::camera::CameraError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("{message}")]
    Backend {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Session missing, expired or rejected
    #[error("Sessão expirada. Entre novamente.")]
    Unauthorized,

    /// Current profile may not read or write the requested site
    #[error("Acesso negado: {0}")]
    Forbidden(String),

    /// Local form validation failed
    #[error("{0}")]
    Validation(String),

    /// Camera acquisition or snapshot failed
    #[error(transparent)]
    Camera(#[from] CameraError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected payload shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Report export error
    #[error("Export error: {0}")]
    Export(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias for AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Message shown when the backend cannot be reached at all.
const OFFLINE_MESSAGE: &str = "Erro de conexão: verifique a internet e o endereço do servidor nas configurações.";

impl AppError {
    /// Create a validation error with message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a config error with message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a forbidden error with message
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Create an export error with message
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Create a not found error with message
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Whether the error means the stored session can no longer be used.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Unauthorized => true,
            Self::Backend { status, .. } => *status == 401,
            _ => false,
        }
    }

    /// Sentence suitable for an inline error banner.
    ///
    /// Backend messages pass through verbatim unless they match a known
    /// failure signature.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(e) if e.is_connect() || e.is_timeout() || e.is_request() => OFFLINE_MESSAGE.to_string(),
            Self::Backend { code, message, .. } => friendly_backend_message(code.as_deref(), message),
            Self::Camera(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

fn friendly_backend_message(code: Option<&str>, message: &str) -> String {
    if message == "Invalid login credentials" || code == Some("invalid_credentials") {
        return "E-mail ou senha incorretos.".to_string();
    }
    if message == "Failed to fetch" {
        return OFFLINE_MESSAGE.to_string();
    }

    let lower = message.to_lowercase();
    let missing_column = matches!(code, Some("42703") | Some("PGRST204"))
        || (lower.contains("column") && (lower.contains("does not exist") || lower.contains("schema cache")));
    if missing_column {
        return format!("O banco de dados não possui uma coluna esperada. Avise o administrador. ({message})");
    }

    message.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(code: Option<&str>, message: &str) -> AppError {
        AppError::Backend {
            status: 400,
            code: code.map(str::to_string),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_invalid_credentials_are_translated() {
        let err = backend(Some("invalid_grant"), "Invalid login credentials");
        assert_eq!(err.user_message(), "E-mail ou senha incorretos.");
    }

    #[test]
    fn test_missing_column_by_code() {
        let err = backend(Some("PGRST204"), "Could not find the 'foto_placa' column of 'visitantes'");
        assert!(err.user_message().starts_with("O banco de dados não possui"));
    }

    #[test]
    fn test_missing_column_by_message() {
        let err = backend(None, "column visitantes.capacete does not exist");
        assert!(err.user_message().contains("visitantes.capacete"));
    }

    #[test]
    fn test_unknown_backend_message_passes_through() {
        let err = backend(Some("23505"), "duplicate key value violates unique constraint");
        assert_eq!(err.user_message(), "duplicate key value violates unique constraint");
    }

    #[test]
    fn test_auth_failure_detection() {
        assert!(AppError::Unauthorized.is_auth_failure());
        let expired = AppError::Backend {
            status: 401,
            code: None,
            message: "JWT expired".to_string(),
        };
        assert!(expired.is_auth_failure());
        assert!(!AppError::validation("x").is_auth_failure());
    }
}
