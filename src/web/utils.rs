//! Shared helpers for HTTP handlers.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::EngagementError;

/// Build a standard JSON error response.
pub fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, axum::Json(body)).into_response()
}

pub fn status_for(error: &EngagementError) -> StatusCode {
    match error {
        EngagementError::NotFound { .. } => StatusCode::NOT_FOUND,
        EngagementError::Validation(_) | EngagementError::InvalidField { .. } => {
            StatusCode::BAD_REQUEST
        }
        EngagementError::ConcurrencyConflict { .. } => StatusCode::CONFLICT,
        EngagementError::Delivery { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for EngagementError {
    fn into_response(self) -> Response {
        api_error(status_for(&self), self.to_string())
    }
}

/// Malformed JSON bodies count as validation failures.
pub fn bad_body(rejection: JsonRejection) -> Response {
    api_error(StatusCode::BAD_REQUEST, rejection.body_text())
}
