use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    Json,
};
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

/// Rejected input. Nothing is written when one of these is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("painLevel must be between 1 and 10, got {0}")]
    PainLevelOutOfRange(i64),
    #[error("{field} must not be negative")]
    NegativeDuration { field: &'static str },
    #[error("weather humidity must be between 0 and 100, got {0}")]
    HumidityOutOfRange(f64),
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("entry '{0}' already exists")]
    Conflict(String),
    #[error("stored entry '{id}' is unreadable: {reason}")]
    Corrupt { id: String, reason: String },
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode config: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        warn!("rejected request: {err}");
        Self::bad_request(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Invalid(err) => err.into(),
            conflict @ StoreError::Conflict(_) => Self {
                status: StatusCode::CONFLICT,
                message: conflict.to_string(),
            },
            other => {
                error!("entry store failure: {other}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "storage unavailable".to_string(),
                }
            }
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Invalid(err) => err.into(),
            other => {
                error!("config failure: {other}");
                Self::internal(other)
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("rejected request body: {}", rejection.body_text());
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        warn!("rejected query string: {}", rejection.body_text());
        Self::bad_request(rejection.body_text())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
