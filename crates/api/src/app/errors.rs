//! Error taxonomy → HTTP response mapping (spec §7).
//!
//! Every fallible handler returns `Result<T, ApiError>`; this is the single
//! place that decides status codes and body text so no handler has to.
//! Detail strings from `StorageError::Io` are logged but never echoed back.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ims_auth::AuthError;
use ims_core::DomainError;
use ims_directory::DirectoryError;
use ims_store::StorageError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    Unauthenticated,
    Forbidden(String),
    Internal,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "authentication required".to_string()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
        };
        (status, body).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => ApiError::NotFound,
            StorageError::Validation(msg) => ApiError::BadRequest(msg),
            StorageError::Conflict(msg) => ApiError::BadRequest(msg),
            StorageError::Io(detail) => {
                tracing::error!(error = %detail, "storage failure");
                ApiError::Internal
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound => ApiError::NotFound,
            DomainError::Unauthorized => ApiError::Forbidden("not authorized".to_string()),
            DomainError::Validation(msg) | DomainError::InvariantViolation(msg) | DomainError::InvalidId(msg) => {
                ApiError::BadRequest(msg)
            }
            DomainError::Conflict(msg) => ApiError::BadRequest(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotAuthenticated => ApiError::Unauthenticated,
            AuthError::NotAuthorized(msg) => ApiError::Forbidden(msg),
            AuthError::InvalidCredentials => ApiError::Unauthenticated,
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        tracing::error!(error = %err, "directory backend failure");
        ApiError::Internal
    }
}
