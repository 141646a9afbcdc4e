use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::pocket::PocketError;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// The connection pool could not be built.
    #[error("Connection pool creation error: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    /// A column was missing or had an unexpected type.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// Any failure talking to Pocket.
    #[error(transparent)]
    Upstream(#[from] PocketError),

    /// The session token could not be decoded or authenticated.
    #[error("Invalid session token")]
    InvalidSessionToken,

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// The account has not finished linking to Pocket.
    #[error("Account is not linked to Pocket")]
    NotLinked,

    /// The account has no pending request code to exchange.
    #[error("Account has no pending authorization")]
    NotPending,

    /// A uniqueness constraint was violated by a concurrent write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A required query parameter was absent or blank.
    #[error("missing required query parameter {0}")]
    MissingParameter(&'static str),

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An encryption error.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// A migration error.
    #[error("Migration error: {0}")]
    Migration(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),

    /// A request that was refused; the message is safe to show the caller.
    #[error("Forbidden: {0}")]
    Forbidden(&'static str),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Logs the underlying failure and replaces it with a caller-safe 403.
    ///
    /// Handlers that sit behind a session token use this so that a bad token,
    /// a missing account and a Pocket failure all look the same from outside.
    pub fn into_forbidden(self, message: &'static str) -> AppError {
        match self {
            AppError::MissingParameter(_) | AppError::Validation(_) => self,
            other => {
                tracing::error!(error = %other, "❌ {}", message);
                AppError::Forbidden(message)
            }
        }
    }

    /// The status code this error is answered with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingParameter(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidSessionToken
            | AppError::NotLinked
            | AppError::NotPending
            | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }

            AppError::Pool(ref e) => {
                tracing::error!("Connection pool error: {}", e);
                "Database error".to_string()
            }

            AppError::CreatePool(ref e) => {
                tracing::error!("Connection pool creation error: {}", e);
                "Database error".to_string()
            }

            AppError::MissingData(ref column) => {
                tracing::error!("Missing data in column: {}", column);
                "Database error".to_string()
            }

            AppError::Upstream(ref e) => {
                tracing::error!("Upstream error: {}", e);
                "Pocket request failed".to_string()
            }

            AppError::InvalidSessionToken
            | AppError::NotLinked
            | AppError::NotPending => {
                tracing::warn!("Authorization failed: {}", self);
                "Forbidden".to_string()
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                "Resource not found".to_string()
            }

            AppError::Conflict(ref msg) => {
                tracing::warn!("Conflict: {}", msg);
                "Conflict".to_string()
            }

            AppError::MissingParameter(_) => {
                tracing::debug!("{}", self);
                self.to_string()
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                msg.clone()
            }

            AppError::Encryption(ref msg) => {
                tracing::error!("Encryption error: {}", msg);
                "Encryption error".to_string()
            }

            AppError::Migration(ref msg) => {
                tracing::error!("Migration error: {}", msg);
                "Migration error".to_string()
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }

            AppError::Forbidden(msg) => msg.to_string(),
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}
