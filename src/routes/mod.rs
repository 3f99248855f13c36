pub mod auth;
pub mod calendar;
pub mod events;
pub mod notes;
pub mod pages;

use axum::{
    Json,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use calnotes_core::CalNotesError;
use serde::Serialize;
use thiserror::Error;

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Standard API success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Json<Self> {
        Json(SuccessResponse { success: true })
    }
}

/// Raised when a protected route is hit without a valid session.
#[derive(Error, Debug)]
#[error("Unauthorized")]
pub struct Unauthenticated;

/// Convert anyhow errors to HTTP responses
pub struct AppError(anyhow::Error);

impl AppError {
    pub fn unauthenticated() -> Self {
        Self(Unauthenticated.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self(CalNotesError::Validation(message.into()).into())
    }

    pub fn status(&self) -> StatusCode {
        if self.0.is::<Unauthenticated>() {
            return StatusCode::UNAUTHORIZED;
        }
        match self.0.downcast_ref::<CalNotesError>() {
            Some(CalNotesError::Validation(_)) => StatusCode::BAD_REQUEST,
            Some(CalNotesError::DuplicateUsername(_)) => StatusCode::BAD_REQUEST,
            Some(CalNotesError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            Some(CalNotesError::NotFound(_)) => StatusCode::NOT_FOUND,
            Some(CalNotesError::Store(_)) | Some(CalNotesError::Hashing(_)) | None => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("request failed: {:#}", self.0);
        }
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Whether the client asked for a JSON reply rather than a redirect.
pub fn wants_json(headers: &HeaderMap) -> bool {
    let accepts_json = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));
    let sent_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    accepts_json || sent_json
}
