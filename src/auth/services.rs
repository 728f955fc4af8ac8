use std::{sync::Arc, time::Duration};

use axum::extract::FromRef;
use serde::Serialize;
use tracing::{info, warn};

use super::{
    claims::Identity,
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo::{Session, SessionRepo},
};
use crate::{
    state::AppState,
    users::repo::{NewUser, User, UserRepo},
};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email not found")]
    EmailNotFound,

    #[error("Wrong password")]
    WrongPassword,

    #[error("Email already exists")]
    EmailExists,

    #[error("Please provide a new password")]
    SamePassword,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Result of a successful login or registration.
#[derive(Debug, Serialize)]
pub struct Authenticated {
    pub user: User,
    pub session: Session,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub is_admin: bool,
}

/// Issues sessions for login and registration.
///
/// Login invalidates the user's active sessions and then creates the new one as
/// two separate statements, awaited in that order. They are not wrapped in a
/// transaction: two concurrent logins for the same user can both end up active,
/// and a failure between the writes leaves the user with no active session.
#[derive(Clone)]
pub struct SessionManager {
    users: Arc<dyn UserRepo>,
    sessions: Arc<dyn SessionRepo>,
    keys: JwtKeys,
}

impl FromRef<AppState> for SessionManager {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.users.clone(),
            state.sessions.clone(),
            JwtKeys::from_ref(state),
        )
    }
}

impl SessionManager {
    pub fn new(users: Arc<dyn UserRepo>, sessions: Arc<dyn SessionRepo>, keys: JwtKeys) -> Self {
        Self {
            users,
            sessions,
            keys,
        }
    }

    /// Lifetime of issued tokens; also the `SESSID` cookie max-age.
    pub fn token_max_age(&self) -> Duration {
        self.keys.ttl
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Authenticated, AuthError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::EmailNotFound)?;

        if !verify_password(password, &user.password)? {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(AuthError::WrongPassword);
        }

        let closed = self.sessions.log_out_all_for_user(user.id).await?;
        let session = self.open_session(&user).await?;

        info!(user_id = %user.id, session_id = %session.id, closed, "user logged in");
        Ok(Authenticated { user, session })
    }

    pub async fn register(&self, reg: Registration) -> Result<Authenticated, AuthError> {
        if self.users.find_by_email(&reg.email).await?.is_some() {
            return Err(AuthError::EmailExists);
        }

        let password_hash = hash_password(&reg.password)?;
        let user = self
            .users
            .create(NewUser {
                first_name: reg.first_name,
                last_name: reg.last_name,
                email: reg.email,
                password_hash,
                is_admin: reg.is_admin,
            })
            .await?;
        let session = self.open_session(&user).await?;

        info!(user_id = %user.id, session_id = %session.id, "user registered");
        Ok(Authenticated { user, session })
    }

    /// Existing sessions stay valid after a password change.
    pub async fn update_password(
        &self,
        email: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<User, AuthError> {
        if new_password == old_password {
            return Err(AuthError::SamePassword);
        }

        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::EmailNotFound)?;

        if !verify_password(old_password, &user.password)? {
            warn!(user_id = %user.id, "password update with wrong password");
            return Err(AuthError::WrongPassword);
        }

        let hash = hash_password(new_password)?;
        let updated = self
            .users
            .update_password_by_email(email, &hash)
            .await?
            .ok_or(AuthError::EmailNotFound)?;

        info!(user_id = %updated.id, "password updated");
        Ok(updated)
    }

    async fn open_session(&self, user: &User) -> Result<Session, AuthError> {
        let token = self.keys.sign(&Identity::from(user))?;
        Ok(self.sessions.create(user.id, &token).await?)
    }
}
