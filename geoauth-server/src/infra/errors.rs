use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use geoauth_core::auth::{AuthErrorKind, AuthenticationError};

/// Error returned by middleware and guards that reject a request before a
/// handler builds its own response body.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "message": self.message,
        }));

        (self.status, body).into_response()
    }
}

impl From<AuthenticationError> for AppError {
    fn from(err: AuthenticationError) -> Self {
        if err.is_fatal() {
            tracing::error!(error = %err, "authentication request failed");
        }
        Self::new(status_for(&err), err.public_message())
    }
}

/// HTTP status for an orchestrator failure.
pub fn status_for(err: &AuthenticationError) -> StatusCode {
    match err.kind() {
        AuthErrorKind::Validation => StatusCode::BAD_REQUEST,
        AuthErrorKind::Authentication => StatusCode::UNAUTHORIZED,
        AuthErrorKind::Conflict => StatusCode::CONFLICT,
        AuthErrorKind::NotFound => StatusCode::NOT_FOUND,
        AuthErrorKind::Store | AuthErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// `200 OK` on success, otherwise the status for the failure.
pub fn result_status<T>(result: &Result<T, AuthenticationError>) -> StatusCode {
    match result {
        Ok(_) => StatusCode::OK,
        Err(err) => status_for(err),
    }
}
