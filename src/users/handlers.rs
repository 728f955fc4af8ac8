use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{AdminFlagRequest, ProfileRequest},
    repo::{ProfileChanges, User},
};
use crate::{
    auth::{
        extractors::{AuthUser, RequireAdmin},
        policy,
        services::AuthError,
    },
    error::{ApiError, ApiResult},
    response::{done, present, success, Envelope, MISSING_INPUTS},
    state::AppState,
    store::parse_id,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).put(update_self).delete(delete_self))
        .route("/users/admins", get(list_admins))
        .route("/users/make-admin", put(make_admin))
        .route("/users/remove-admin", put(remove_admin))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> ApiResult<Json<Envelope<Vec<User>>>> {
    let users = state.users.list(false).await?;
    Ok(success(users, "Users retrieved successfully"))
}

#[instrument(skip(state, _admin))]
pub async fn list_admins(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> ApiResult<Json<Envelope<Vec<User>>>> {
    let admins = state.users.list(true).await?;
    Ok(success(admins, "Admins retrieved successfully"))
}

#[instrument(skip(state, who))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<Option<User>>>> {
    let id = parse_id(&id);
    policy::require_self_or_admin(&who, id)?;

    let user = match id {
        Some(id) => state.users.find_by_id(id).await?,
        None => None,
    };
    Ok(success(user, "User retrieved successfully"))
}

#[instrument(skip(state, _admin, payload))]
pub async fn make_admin(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(payload): Json<AdminFlagRequest>,
) -> ApiResult<Json<Envelope<()>>> {
    set_admin_flag(&state, payload, true).await
}

#[instrument(skip(state, _admin, payload))]
pub async fn remove_admin(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(payload): Json<AdminFlagRequest>,
) -> ApiResult<Json<Envelope<()>>> {
    set_admin_flag(&state, payload, false).await
}

async fn set_admin_flag(
    state: &AppState,
    payload: AdminFlagRequest,
    admin: bool,
) -> ApiResult<Json<Envelope<()>>> {
    let Some(raw) = present(payload.id) else {
        return Err(ApiError::BadRequest("Please provide user id".into()));
    };
    // an id that cannot exist changes nothing
    if let Some(id) = parse_id(&raw) {
        if state.users.set_admin(id, admin).await?.is_some() {
            info!(user_id = %id, admin, "admin flag changed");
        }
    }
    Ok(done("User updated successfully"))
}

#[instrument(skip(state, _admin, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    Json(payload): Json<ProfileRequest>,
) -> ApiResult<Json<Envelope<User>>> {
    let changes = ProfileChanges::from(payload);
    ensure_email_free(&state, &changes).await?;

    let updated = match parse_id(&id) {
        Some(id) => state.users.update_profile(id, changes).await?,
        None => None,
    };
    let user = updated.ok_or_else(|| ApiError::BadRequest(MISSING_INPUTS.into()))?;
    Ok(success(user, "User updated successfully"))
}

#[instrument(skip(state, who, payload), fields(user_id = %who.id))]
pub async fn update_self(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Json(payload): Json<ProfileRequest>,
) -> ApiResult<Json<Envelope<Option<User>>>> {
    let changes = ProfileChanges::from(payload);
    ensure_email_free(&state, &changes).await?;

    let user = state.users.update_profile(who.id, changes).await?;
    Ok(success(user, "User updated successfully"))
}

/// Any existing holder of the requested email blocks the update, the caller included.
async fn ensure_email_free(state: &AppState, changes: &ProfileChanges) -> ApiResult<()> {
    if let Some(email) = &changes.email {
        if state.users.find_by_email(email).await?.is_some() {
            return Err(AuthError::EmailExists.into());
        }
    }
    Ok(())
}

#[instrument(skip(state, _admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<()>>> {
    if let Some(id) = parse_id(&id) {
        remove_account(&state, id).await?;
    }
    Ok(done("User deleted successfully"))
}

#[instrument(skip(state, who), fields(user_id = %who.id))]
pub async fn delete_self(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
) -> ApiResult<Json<Envelope<()>>> {
    remove_account(&state, who.id).await?;
    Ok(done("User deleted successfully"))
}

/// Sessions reference the user without cascading, so they go first.
async fn remove_account(state: &AppState, id: Uuid) -> ApiResult<()> {
    let sessions = state.sessions.delete_all_for_user(id).await?;
    state.users.delete(id).await?;
    info!(user_id = %id, sessions, "user deleted");
    Ok(())
}
