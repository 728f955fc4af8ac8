use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use crate::{
    auth::{extractors::GateError, services::AuthError},
    response::Envelope,
};

/// Session exists but was logged out.
pub const STATUS_SESSION_EXPIRED: u16 = 440;
/// Stored token failed signature or expiry checks.
pub const STATUS_TOKEN_INVALID: u16 = 498;

/// Error type returned by every handler; renders the `{status, msg}` envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Wrong password")]
    WrongPassword,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Token not valid")]
    TokenInvalid,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::WrongPassword => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::SessionExpired => custom_status(STATUS_SESSION_EXPIRED),
            ApiError::TokenInvalid => custom_status(STATUS_TOKEN_INVALID),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn custom_status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match &self {
            ApiError::Internal(e) => {
                error!(error = %format!("{e:#}"), "unhandled store failure");
                "Something went wrong".to_string()
            }
            other => {
                warn!(%status, msg = %other, "request rejected");
                other.to_string()
            }
        };
        (status, Json(Envelope::error(msg))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::EmailNotFound => ApiError::NotFound(e.to_string()),
            AuthError::WrongPassword => ApiError::WrongPassword,
            AuthError::EmailExists => ApiError::Conflict(e.to_string()),
            AuthError::SamePassword => ApiError::BadRequest(e.to_string()),
            AuthError::Store(inner) => ApiError::Internal(inner),
        }
    }
}

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::MissingOrMalformedSessionId => ApiError::BadRequest(e.to_string()),
            GateError::SessionNotFound => ApiError::NotFound(e.to_string()),
            GateError::SessionExpired => ApiError::SessionExpired,
            GateError::TokenInvalid => ApiError::TokenInvalid,
            GateError::Store(inner) => ApiError::Internal(inner),
        }
    }
}
