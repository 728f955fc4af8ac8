use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String, // argon2 hash, not exposed in JSON
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Partial profile update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(&self, new: NewUser) -> anyhow::Result<User>;
    async fn list(&self, admins_only: bool) -> anyhow::Result<Vec<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Exact, case-sensitive match on the stored email.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn update_profile(&self, id: Uuid, changes: ProfileChanges)
        -> anyhow::Result<Option<User>>;
    async fn set_admin(&self, id: Uuid, admin: bool) -> anyhow::Result<Option<User>>;
    async fn update_password_by_email(
        &self,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<Option<User>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (first_name, last_name, email, password, is_admin)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, first_name, last_name, email, password, is_admin
            "#,
        )
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.is_admin)
        .fetch_one(&self.db)
        .await
        .context("could not create user")?;
        Ok(user)
    }

    async fn list(&self, admins_only: bool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, password, is_admin
            FROM users
            WHERE is_admin OR NOT $1
            ORDER BY created_at
            "#,
        )
        .bind(admins_only)
        .fetch_all(&self.db)
        .await
        .context("could not list users")?;
        Ok(users)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, password, is_admin
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("could not get user by id: {id}"))?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, password, is_admin
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("could not get user by email")?;
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = COALESCE($1, first_name),
                last_name  = COALESCE($2, last_name),
                email      = COALESCE($3, email)
            WHERE id = $4
            RETURNING id, first_name, last_name, email, password, is_admin
            "#,
        )
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.email)
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("could not update user profile by id: {id}"))?;
        Ok(user)
    }

    async fn set_admin(&self, id: Uuid, admin: bool) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET is_admin = $1 WHERE id = $2
            RETURNING id, first_name, last_name, email, password, is_admin
            "#,
        )
        .bind(admin)
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("could not set admin={admin} for user id: {id}"))?;
        Ok(user)
    }

    async fn update_password_by_email(
        &self,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET password = $1 WHERE email = $2
            RETURNING id, first_name, last_name, email, password, is_admin
            "#,
        )
        .bind(password_hash)
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("could not update user password")?;
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .with_context(|| format!("could not delete user by id: {id}"))?;
        Ok(())
    }
}
