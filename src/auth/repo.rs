use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// One login. Only `logged_out`/`logged_out_at` ever change after insert.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub logged_out: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub logged_out_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait SessionRepo: Send + Sync {
    async fn create(&self, user_id: Uuid, token: &str) -> anyhow::Result<Session>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Session>>;
    /// Flags every still-active session of the user as logged out. Returns rows touched.
    async fn log_out_all_for_user(&self, user_id: Uuid) -> anyhow::Result<u64>;
    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Session>>;
    async fn delete_all_for_user(&self, user_id: Uuid) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgSessionRepo {
    db: PgPool,
}

impl PgSessionRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionRepo for PgSessionRepo {
    async fn create(&self, user_id: Uuid, token: &str) -> anyhow::Result<Session> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, token, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token, created_at, logged_out, logged_out_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&self.db)
        .await
        .context("could not create session")?;
        Ok(session)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, token, created_at, logged_out, logged_out_at
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("could not find session by id: {id}"))?;
        Ok(session)
    }

    async fn log_out_all_for_user(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let done = sqlx::query(
            r#"
            UPDATE sessions
            SET logged_out = true, logged_out_at = $1
            WHERE logged_out = false AND user_id = $2
            "#,
        )
        .bind(OffsetDateTime::now_utc())
        .bind(user_id)
        .execute(&self.db)
        .await
        .with_context(|| format!("could not log out sessions of user id: {user_id}"))?;
        Ok(done.rows_affected())
    }

    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Session>> {
        let sessions = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, token, created_at, logged_out, logged_out_at
            FROM sessions
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .with_context(|| format!("could not get sessions of user id: {user_id}"))?;
        Ok(sessions)
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let done = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await
            .with_context(|| format!("could not delete sessions of user id: {user_id}"))?;
        Ok(done.rows_affected())
    }
}
