//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Centralizes HTTP error response construction so every endpoint answers with
//! the same `{"reason": ...}` body.
//!
//! # Key invariants and assumptions
//! - Status codes must align with the error category.
//! - Internal errors log details server-side but return generic reasons.
use crate::api::types::ErrorResponse;
use crate::directory::DirectoryError;
use crate::policy::Denial;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Structured API error returned by handlers.
///
/// # Example
/// ```rust
/// use axum::http::StatusCode;
/// use tenders::api::error::ApiError;
/// use tenders::api::types::ErrorResponse;
///
/// let err = ApiError {
///     status: StatusCode::NOT_FOUND,
///     body: ErrorResponse {
///         reason: "tender not found".to_string(),
///     },
/// };
/// ```
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn api_error(status: StatusCode, reason: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            reason: reason.to_string(),
        },
    }
}

/// Build a 404 Not Found error.
pub fn api_not_found(reason: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, reason)
}

/// Build a 409 Conflict error.
pub fn api_conflict(reason: &str) -> ApiError {
    api_error(StatusCode::CONFLICT, reason)
}

/// Build a 500 Internal Server Error from a store error.
///
/// The store error is logged; the client only sees `reason`.
pub fn api_internal(reason: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "tender storage error");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, reason)
}

/// Build a 500 Internal Server Error from a failed directory lookup.
pub fn api_directory_unavailable(err: &DirectoryError) -> ApiError {
    tracing::error!(error = ?err, "directory lookup failed");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "directory unavailable")
}

/// Build a 401 Unauthorized error.
pub fn api_unauthorized(reason: &str) -> ApiError {
    api_error(StatusCode::UNAUTHORIZED, reason)
}

/// Build a 403 Forbidden error.
pub fn api_forbidden(reason: &str) -> ApiError {
    api_error(StatusCode::FORBIDDEN, reason)
}

/// Build a 400 Bad Request validation error.
pub fn api_validation_error(reason: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, reason)
}

/// Map a store failure on a tender lookup or write.
pub fn api_store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound(_) => api_not_found("tender not found"),
        StoreError::AlreadyExists(_) => api_conflict("tender already exists"),
        StoreError::Unexpected(_) => api_internal("tender storage failed", &err),
    }
}

/// Map a policy denial to 403.
pub fn api_denied(denial: Denial) -> ApiError {
    match denial {
        Denial::Hidden => api_forbidden("tender is not available"),
        Denial::NotResponsible => {
            api_forbidden("user not in organization. Tender is not available")
        }
    }
}
