use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderValue},
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    claims::Identity,
    dto::{LoginRequest, RegisterRequest, UpdatePasswordRequest},
    extractors::{AuthUser, SESSION_COOKIE},
    services::{Authenticated, Registration, SessionManager},
};
use crate::{
    error::{ApiError, ApiResult},
    response::{present, success, Envelope, MISSING_INPUTS},
    state::AppState,
    users::repo::User,
};

type WithCookie<T> = ([(axum::http::HeaderName, HeaderValue); 1], Json<Envelope<T>>);

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/update-password", put(update_password))
        .route("/verify-session", get(verify_session))
}

/// `SESSID=<id>` cookie carrying the new session id, aligned with the token lifetime.
fn session_cookie(manager: &SessionManager, auth: &Authenticated) -> ApiResult<HeaderValue> {
    let value = format!(
        "{SESSION_COOKIE}={}; HttpOnly; Path=/; Max-Age={}",
        auth.session.id,
        manager.token_max_age().as_secs()
    );
    HeaderValue::from_str(&value).map_err(|e| ApiError::Internal(e.into()))
}

#[instrument(skip(manager, payload))]
pub async fn login(
    State(manager): State<SessionManager>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<WithCookie<Authenticated>> {
    let (Some(email), Some(password)) = (present(payload.email), present(payload.password))
    else {
        return Err(ApiError::BadRequest(MISSING_INPUTS.into()));
    };

    let auth = manager.login(&email, &password).await?;
    let cookie = session_cookie(&manager, &auth)?;
    Ok((
        [(SET_COOKIE, cookie)],
        success(auth, "User logged in successfully"),
    ))
}

#[instrument(skip(manager, payload))]
pub async fn register(
    State(manager): State<SessionManager>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<WithCookie<Authenticated>> {
    let (Some(first_name), Some(last_name), Some(email), Some(password)) = (
        present(payload.first_name),
        present(payload.last_name),
        present(payload.email),
        present(payload.password),
    ) else {
        return Err(ApiError::BadRequest(MISSING_INPUTS.into()));
    };

    let auth = manager
        .register(Registration {
            first_name,
            last_name,
            email,
            password,
            is_admin: false,
        })
        .await?;
    let cookie = session_cookie(&manager, &auth)?;
    Ok((
        [(SET_COOKIE, cookie)],
        success(auth, "User registered successfully"),
    ))
}

#[instrument(skip(manager, who, payload), fields(user_id = %who.id))]
pub async fn update_password(
    State(manager): State<SessionManager>,
    AuthUser(who): AuthUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> ApiResult<Json<Envelope<User>>> {
    let (Some(email), Some(password), Some(new_password)) = (
        present(payload.email),
        present(payload.password),
        present(payload.new_password),
    ) else {
        return Err(ApiError::BadRequest(MISSING_INPUTS.into()));
    };

    let user = manager
        .update_password(&email, &password, &new_password)
        .await?;
    Ok(success(user, "Password updated successfully"))
}

pub async fn verify_session(AuthUser(who): AuthUser) -> Json<Envelope<Identity>> {
    success(who, "User verified successfully")
}
