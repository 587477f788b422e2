//! Error types for the query service.

use crate::query::ExtractionError;
use crate::session::SessionError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for service operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid client input. The message is returned to the caller as is.
    #[error("{0}")]
    Validation(String),

    /// Extraction failure (LLM call, invalid JSON, unexpected shape)
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session storage error
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
