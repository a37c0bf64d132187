use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DatabaseConfig;

const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Opens the pool, retrying a bounded number of times while the database comes up.
pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .connect(&cfg.url)
            .await
        {
            Ok(pool) => {
                info!(attempt, "connected to database");
                return Ok(pool);
            }
            Err(e) if attempt <= cfg.connect_retries => {
                warn!(error = %e, attempt, "database connection failed; retrying");
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            }
            Err(e) => return Err(e).context("connect to database"),
        }
    }
}

pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("run database migrations")?;
    info!("migrations applied");
    Ok(())
}

/// Failure raised by a store implementation.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        let unique = e
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if unique {
            Self::UniqueViolation
        } else {
            Self::Database(e)
        }
    }
}
