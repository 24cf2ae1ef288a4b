//! Error types for the HTTP server

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

/// Result type for server startup
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop the server from starting or serving
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] conduit_core::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid listen address '{0}'")]
    InvalidAddress(String),
}

/// Result type for route handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// An error answered with a status code and a JSON body carrying `error`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// A mapping that failed to compile or evaluate: `{error: "Mapping error", message}`
    pub fn mapping(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": "Mapping error", "message": message.into() }),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

impl From<conduit_core::Error> for ApiError {
    fn from(error: conduit_core::Error) -> Self {
        use conduit_core::Error as E;
        match &error {
            E::InvalidInput(_) | E::Validation { .. } => Self::bad_request(error.to_string()),
            E::Mapping(e) => Self::mapping(e.to_string()),
            E::NotFound(_) => Self::not_found(error.to_string()),
            E::Conflict(_) | E::RunInProgress { .. } => Self::conflict(error.to_string()),
            _ => {
                tracing::error!(%error, "Request failed");
                Self::internal(error.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(error: tokio::task::JoinError) -> Self {
        tracing::error!(%error, "Blocking task failed");
        Self::internal("Background task failed")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
