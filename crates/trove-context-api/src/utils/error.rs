use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure kinds of the context store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<sqlx::Error> for ContextError {
    fn from(err: sqlx::Error) -> Self {
        ContextError::StorageUnavailable(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for ContextError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        ContextError::StorageUnavailable(format!("migration failed: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<ContextError> for ApiError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::NotFound(msg) => ApiError::NotFound(msg),
            ContextError::InvalidInput(msg) => ApiError::BadRequest(msg),
            ContextError::StorageUnavailable(msg) => ApiError::StorageUnavailable(msg),
        }
    }
}

/// Unreadable request bodies (bad JSON, wrong content type, unknown
/// `direction`) answer with the same envelope as store errors.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    ok: bool,
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(msg) => {
                tracing::warn!("Not found: {}", msg);
                (StatusCode::NOT_FOUND, "NotFound", msg)
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, "InvalidInput", msg)
            }
            ApiError::StorageUnavailable(msg) => {
                tracing::error!("Storage unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "StorageUnavailable", msg)
            }
        };

        let body = Json(ErrorResponse {
            ok: false,
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
