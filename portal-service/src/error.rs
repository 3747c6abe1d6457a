use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common_auth::AuthError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Failure taxonomy surfaced to callers. Authentication and refresh failures
/// carry fixed messages so a caller cannot tell which check failed.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid email or password.")]
    AuthenticationFailure,
    #[error("Token is invalid.")]
    TokenInvalid,
    #[error("Refresh token is invalid.")]
    RefreshInvalid,
    #[error("Insufficient role.")]
    AuthorizationDenied,
    #[error("{0} not found.")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("Storage is unavailable.")]
    StoreUnavailable,
    #[error("{0} was not modified.")]
    NotModified(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("Too many requests, retry later.")]
    RateLimited,
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::AuthenticationFailure => "INVALID_CREDENTIALS",
            ApiError::TokenInvalid => "TOKEN_INVALID",
            ApiError::RefreshInvalid => "REFRESH_INVALID",
            ApiError::AuthorizationDenied => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::StoreUnavailable => "STORE_UNAVAILABLE",
            ApiError::NotModified(_) => "NOT_MODIFIED",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::RateLimited => "RATE_LIMITED",
            ApiError::Internal(_) => "SERVER_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthenticationFailure | ApiError::TokenInvalid | ApiError::RefreshInvalid => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::AuthorizationDenied => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::NotModified(_) => StatusCode::CONFLICT,
            ApiError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(detail) => ApiError::Conflict(detail),
            StoreError::Timeout(_) | StoreError::Backend(_) => {
                error!(error = %value, "store call failed");
                ApiError::StoreUnavailable
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::TokenInvalid(_)
            | AuthError::MissingAuthorization
            | AuthError::InvalidAuthorization => ApiError::TokenInvalid,
            AuthError::Forbidden { .. } => ApiError::AuthorizationDenied,
            AuthError::Config(_) | AuthError::Signing(_) => {
                error!(error = %value, "credential signing failed");
                ApiError::Internal("Unable to issue authentication tokens.".to_string())
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
