use axum::async_trait;
use sqlx::PgPool;

use super::repo_types::User;
use crate::db::RepoError;

/// Persistence for user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, RepoError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
    /// True when any user already holds `username` or `email`.
    async fn username_or_email_taken(&self, username: &str, email: &str)
        -> Result<bool, RepoError>;
    async fn create(&self, username: &str, email: &str, password_hash: &str)
        -> Result<User, RepoError>;
    /// Sets whichever fields are `Some`; returns `None` when the user no longer exists.
    async fn update_profile(
        &self,
        id: i32,
        username: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, RepoError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn username_or_email_taken(
        &self,
        username: &str,
        email: &str,
    ) -> Result<bool, RepoError> {
        let taken: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 OR email = $2)"#,
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.db)
        .await?;
        Ok(taken)
    }

    async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: i32,
        username: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET username = COALESCE($2, username),
                   password_hash = COALESCE($3, password_hash)
             WHERE id = $1
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}
