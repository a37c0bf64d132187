use axum::async_trait;
use sqlx::PgPool;

use super::repo_types::Apartment;
use crate::db::RepoError;

/// Persistence for the `appartement` table.
#[async_trait]
pub trait ApartmentStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Apartment>, RepoError>;
    async fn find(&self, num_app: &str) -> Result<Option<Apartment>, RepoError>;
    async fn insert(&self, apartment: &Apartment) -> Result<Apartment, RepoError>;
    /// Renames and rewrites `old_key` in one statement; `None` when it does not exist.
    async fn update(
        &self,
        old_key: &str,
        apartment: &Apartment,
    ) -> Result<Option<Apartment>, RepoError>;
    /// Returns false when nothing was deleted.
    async fn delete(&self, num_app: &str) -> Result<bool, RepoError>;
}

#[derive(Clone)]
pub struct PgApartmentStore {
    db: PgPool,
}

impl PgApartmentStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ApartmentStore for PgApartmentStore {
    async fn list(&self) -> Result<Vec<Apartment>, RepoError> {
        let rows = sqlx::query_as::<_, Apartment>(
            r#"
            SELECT num_app, design, loyer::float8 AS loyer
            FROM appartement
            ORDER BY num_app
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find(&self, num_app: &str) -> Result<Option<Apartment>, RepoError> {
        let row = sqlx::query_as::<_, Apartment>(
            r#"
            SELECT num_app, design, loyer::float8 AS loyer
            FROM appartement
            WHERE num_app = $1
            "#,
        )
        .bind(num_app)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn insert(&self, apartment: &Apartment) -> Result<Apartment, RepoError> {
        let row = sqlx::query_as::<_, Apartment>(
            r#"
            INSERT INTO appartement (num_app, design, loyer)
            VALUES ($1, $2, $3)
            RETURNING num_app, design, loyer::float8 AS loyer
            "#,
        )
        .bind(&apartment.num_app)
        .bind(&apartment.design)
        .bind(apartment.loyer)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(
        &self,
        old_key: &str,
        apartment: &Apartment,
    ) -> Result<Option<Apartment>, RepoError> {
        let row = sqlx::query_as::<_, Apartment>(
            r#"
            UPDATE appartement
               SET num_app = $1, design = $2, loyer = $3
             WHERE num_app = $4
            RETURNING num_app, design, loyer::float8 AS loyer
            "#,
        )
        .bind(&apartment.num_app)
        .bind(&apartment.design)
        .bind(apartment.loyer)
        .bind(old_key)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(&self, num_app: &str) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM appartement WHERE num_app = $1")
            .bind(num_app)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
