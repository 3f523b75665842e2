//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from pulse-core, pulse-state and pulse-mail to HTTP
//! status codes with a JSON body:
//!
//! ```json
//! {"error": {"code": "NOT_FOUND", "message": "survey 1234 not found"}}
//! ```
//!
//! Internal and upstream error messages are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details. Answer validation failures name the question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found, or not visible to the caller's tenant (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// A submitted answer set does not fit the questionnaire (422).
    #[error("validation error: {0}")]
    InvalidAnswer(pulse_core::AnswerError),

    /// Request body or query could not be parsed (422).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient role or no tenant binding (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The resource existed but is no longer usable, e.g. an expired link (410).
    #[error("gone: {0}")]
    Gone(String),

    /// Internal server error (500). Message is logged but not returned.
    #[error("internal error: {0}")]
    Internal(String),

    /// A downstream provider (mail) failed (502). Message is logged but not returned.
    #[error("upstream error: {0}")]
    UpstreamError(String),

    /// A dependency is not available (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) | Self::InvalidAnswer(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
            }
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Gone(_) => (StatusCode::GONE, "GONE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::UpstreamError(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            Self::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::UpstreamError(_) => "An upstream service error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::UpstreamError(_) => tracing::error!(error = %self, "upstream service error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            _ => {}
        }

        let details = match &self {
            Self::InvalidAnswer(err) => {
                Some(serde_json::json!({ "question_id": err.question_id() }))
            }
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<pulse_core::ValidationError> for AppError {
    fn from(err: pulse_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<pulse_core::AnswerError> for AppError {
    fn from(err: pulse_core::AnswerError) -> Self {
        Self::InvalidAnswer(err)
    }
}

impl From<pulse_state::InviteError> for AppError {
    fn from(err: pulse_state::InviteError) -> Self {
        match err {
            pulse_state::InviteError::AlreadyCompleted => Self::Conflict(err.to_string()),
            pulse_state::InviteError::Expired { .. } => Self::Gone(err.to_string()),
        }
    }
}

impl From<pulse_state::AssignmentError> for AppError {
    fn from(err: pulse_state::AssignmentError) -> Self {
        Self::Conflict(err.to_string())
    }
}

impl From<pulse_state::ScheduleError> for AppError {
    fn from(err: pulse_state::ScheduleError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<pulse_mail::MailError> for AppError {
    fn from(err: pulse_mail::MailError) -> Self {
        Self::UpstreamError(format!("mail delivery failed: {err}"))
    }
}

/// Unique-constraint violations surface as 409; everything else is a 500.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let unique_violation = err
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == "23505");
        if unique_violation {
            Self::Conflict("a record with the same unique key already exists".to_string())
        } else {
            Self::Internal(format!("database error: {err}"))
        }
    }
}
