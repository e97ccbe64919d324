use axum::{http::StatusCode, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Bad or missing startup parameters
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Backend unreachable, or the adapter is not connected
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// Uniqueness violation on the email key
    #[error("Duplicate: {0}")]
    Duplicate(String),
    /// Any other backend-reported failure
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) | AppError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Duplicate(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    // Backend details stay in the log; the client only sees a generic message for 5xx.
    pub fn to_response(&self) -> (StatusCode, Json<serde_json::Value>) {
        let status = self.status_code();
        let detail = match self {
            AppError::Configuration(_) | AppError::Storage(_) => {
                tracing::error!("{}", self);
                "Internal server error".to_string()
            }
            AppError::Connection(_) => {
                tracing::error!("{}", self);
                "Database connection not available".to_string()
            }
            AppError::NotFound(e)
            | AppError::Duplicate(e)
            | AppError::BadRequest(e)
            | AppError::Validation(e) => {
                tracing::warn!("{}", self);
                e.clone()
            }
        };

        (status, Json(json!({ "detail": detail })))
    }
}
