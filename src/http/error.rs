//! Errors the gateway reports to its own callers.
//!
//! Only caller mistakes and backend rejections (4xx) surface here.
//! Backend unavailability never does: those paths answer with fallbacks
//! or queued-operation acknowledgments instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("X-User-Name header is required")]
    MissingUserName,
    #[error("{0}")]
    NotFound(String),
    /// A non-404 rejection forwarded from a backend, status preserved.
    #[error("{message}")]
    Upstream { status: u16, message: String },
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) | ApiError::MissingUserName => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
        };
        let body = ErrorResponse {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
