use std::sync::Arc;

mod apartments;
mod app;
mod auth;
mod config;
mod db;
mod error;
mod extract;
mod state;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "appartements=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);
    let pool = db::connect(&config.database).await?;
    db::migrate(&pool).await?;

    let app = app::build_app(AppState::from_pool(pool.clone(), config.clone()));
    app::serve(app, &config.server).await?;

    pool.close().await;
    tracing::info!("database pool closed");
    Ok(())
}
