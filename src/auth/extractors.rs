use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::COOKIE, request::Parts, HeaderMap},
};
use tracing::warn;

use super::{claims::Identity, jwt::JwtKeys, policy, repo::SessionRepo};
use crate::{error::ApiError, state::AppState, store::parse_id};

pub const SESSION_HEADER: &str = "sessid";
pub const SESSION_COOKIE: &str = "SESSID";

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Please provide a valid session id")]
    MissingOrMalformedSessionId,

    #[error("No sessions found")]
    SessionNotFound,

    #[error("Session expired")]
    SessionExpired,

    #[error("Token not valid")]
    TokenInvalid,

    #[error(transparent)]
    Store(anyhow::Error),
}

/// Session id from the `sessid` header, falling back to the `SESSID` cookie.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .or_else(|| cookie_value(headers, SESSION_COOKIE))
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| k.trim() == name)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

/// Resolves a presented session id to the identity stored in its token.
///
/// The id is only a lookup key: the identity comes from the token persisted at
/// login, so a session stops working only when it is logged out or its token
/// expires.
pub async fn authenticate(
    sessions: &dyn SessionRepo,
    keys: &JwtKeys,
    raw_session_id: Option<&str>,
) -> Result<Identity, GateError> {
    let session_id = raw_session_id
        .and_then(parse_id)
        .ok_or(GateError::MissingOrMalformedSessionId)?;

    let session = sessions
        .find_by_id(session_id)
        .await
        .map_err(GateError::Store)?
        .ok_or(GateError::SessionNotFound)?;

    if session.logged_out {
        return Err(GateError::SessionExpired);
    }

    keys.verify(&session.token).map_err(|e| {
        warn!(%session_id, error = %e, "stored session token rejected");
        GateError::TokenInvalid
    })
}

/// Identity of the caller, resolved through the session gate.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(AuthUser(identity.clone()));
        }

        let keys = JwtKeys::from_ref(state);
        let raw = session_id_from_headers(&parts.headers);
        let identity = authenticate(state.sessions.as_ref(), &keys, raw).await?;

        parts.extensions.insert(identity.clone());
        Ok(AuthUser(identity))
    }
}

/// Authenticated caller who must also be an admin (401 otherwise).
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;
        policy::require_admin(&identity)?;
        Ok(RequireAdmin(identity))
    }
}
