use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Reasons a credential string failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("failed to encode claims: {0}")]
    Encoding(String),
    #[error("signature does not verify")]
    InvalidSignature,
    #[error("credential is malformed: {0}")]
    Malformed(String),
    #[error("credential has expired")]
    Expired,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid auth configuration: {0}")]
    Config(&'static str),
    #[error("failed to sign credential: {0}")]
    Signing(CodecError),
    /// Any decode failure; the reason is kept for logs but never rendered.
    #[error("token invalid")]
    TokenInvalid(#[source] CodecError),
    #[error("authorization header missing")]
    MissingAuthorization,
    #[error("authorization header malformed")]
    InvalidAuthorization,
    #[error("insufficient role, required '{required}'")]
    Forbidden { required: String },
}

impl AuthError {
    /// Internal decode reason, if this is a validation failure.
    pub fn reason(&self) -> Option<&CodecError> {
        match self {
            AuthError::TokenInvalid(reason) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::MissingAuthorization | AuthError::InvalidAuthorization => {
                (StatusCode::UNAUTHORIZED, "AUTH_HEADER")
            }
            AuthError::TokenInvalid(_) => (StatusCode::UNAUTHORIZED, "TOKEN_INVALID"),
            AuthError::Forbidden { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AuthError::Config(_) | AuthError::Signing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_ERROR")
            }
        };

        let message = match &self {
            AuthError::Config(_) | AuthError::Signing(_) => {
                "Unable to process credentials.".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody { code, message })).into_response()
    }
}
