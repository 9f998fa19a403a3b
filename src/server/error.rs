//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for the core [`Error`] so route handlers can
//! return `Result<T, AppError>` directly. Range errors carry the total
//! file size so a 416 can report `Content-Range: bytes */<size>`.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::Error;

/// Wrapper carrying the core error into an axum response.
pub struct AppError(Error);

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::InvalidRange { .. } => (StatusCode::RANGE_NOT_SATISFIABLE, "invalid_range"),
            Error::RangeNotSatisfiable { .. } => {
                (StatusCode::RANGE_NOT_SATISFIABLE, "range_not_satisfiable")
            }
            Error::InvalidPath(_) => (StatusCode::BAD_REQUEST, "invalid_path"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::TranscodeFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "transcode_error"),
            Error::ThumbnailFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "thumbnail_error"),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "server error in handler");
        }

        let body = axum::Json(json!({
            "error": self.0.to_string(),
            "code": code,
        }));

        // Unsatisfiable/invalid ranges must tell the client the real size.
        match &self.0 {
            Error::InvalidRange { total_size, .. }
            | Error::RangeNotSatisfiable { total_size, .. } => (
                status,
                [(header::CONTENT_RANGE, format!("bytes */{total_size}"))],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}
