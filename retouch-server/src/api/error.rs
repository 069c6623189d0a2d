//! HTTP error mapping.
//!
//! Pipeline errors keep their kind all the way to the response: mask
//! validation failures are the caller's fault (400), everything else
//! surfaces as 500 with the error message in the legacy
//! `{"error": ...}` body shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use retouch_common::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request body content (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Request conflicts with existing state (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Pipeline or collaborator failure, mapped by error kind
    #[error(transparent)]
    Pipeline(#[from] Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Pipeline(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
