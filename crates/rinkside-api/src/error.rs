//! API error handling.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rinkside_db::DbError;
use rinkside_scheduler::SchedulerError;
use serde_json::json;

/// API error type. Renders as `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    /// An upstream service answered with a non-2xx status, relayed as is.
    Upstream { status: u16, message: String },
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Upstream { status, message } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message,
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<rinkside_core::Error> for ApiError {
    fn from(err: rinkside_core::Error) -> Self {
        match err {
            rinkside_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            rinkside_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            rinkside_core::Error::Conflict(msg) => ApiError::Conflict(msg),
            rinkside_core::Error::Upstream { service, status } => ApiError::Upstream {
                status,
                message: format!("{} error: {}", service, status),
            },
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(msg) => ApiError::NotFound(msg),
            DbError::Duplicate(msg) | DbError::Invariant(msg) => ApiError::Conflict(msg),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Source(e) => e.into(),
            SchedulerError::Db(e) => e.into(),
            SchedulerError::TickInProgress | SchedulerError::Unfinished { .. } => {
                ApiError::Conflict(err.to_string())
            }
        }
    }
}
