//! Shared error handling for API endpoints.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::debug;

use crate::session::SessionError;

/// Extension trait for mapping session results onto HTTP errors.
pub trait ResultExt<T> {
    /// `unauthorized` is the message sent for [`SessionError::Unauthorized`].
    fn api_err(self, unauthorized: &'static str) -> Result<T, ApiError>;
}

impl<T> ResultExt<T> for Result<T, SessionError> {
    fn api_err(self, unauthorized: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| match e {
            SessionError::InvalidInput(msg) => ApiError::bad_request(msg),
            SessionError::Unauthorized => ApiError::unauthorized(unauthorized),
            // Reported as a plain bad request, matching the input errors.
            SessionError::Conflict => ApiError::bad_request("email already exists"),
            SessionError::NotFound => ApiError::not_found("not found"),
            SessionError::Internal => ApiError::internal("internal error"),
        })
    }
}

/// API error type with automatic response conversion.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection.body_text(), "Rejected request body");
        Self::bad_request("invalid json")
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
