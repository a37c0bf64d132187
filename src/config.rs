use std::str::FromStr;

use anyhow::{anyhow, Context};
use axum::http::HeaderValue;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:3001";
// One year.
const MAX_JWT_TTL_HOURS: i64 = 8_760;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_retries: u32,
}

/// Allowed CORS origins. `Any` comes from `CORS_ORIGINS=*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: CorsOrigins,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = DatabaseConfig {
            url: lookup("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            connect_retries: parse_or(&lookup, "DB_CONNECT_RETRIES", 5)?,
        };
        if database.max_connections == 0 {
            return Err(anyhow!("DB_MAX_CONNECTIONS must be at least 1"));
        }

        let secret = lookup("JWT_SECRET").context("JWT_SECRET must be set")?;
        if secret.trim().is_empty() {
            return Err(anyhow!("JWT_SECRET must not be empty"));
        }
        let jwt = JwtConfig {
            secret,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "appartements".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "appartements-users".into()),
            ttl_hours: parse_or(&lookup, "JWT_TTL_HOURS", 24)?,
        };
        if !(1..=MAX_JWT_TTL_HOURS).contains(&jwt.ttl_hours) {
            return Err(anyhow!(
                "JWT_TTL_HOURS must be between 1 and {MAX_JWT_TTL_HOURS}"
            ));
        }

        let server = ServerConfig {
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "APP_PORT", 8081)?,
            cors_origins: parse_cors_origins(
                &lookup("CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.into()),
            )?,
        };

        Ok(Self {
            database,
            jwt,
            server,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("invalid {key} '{raw}': {e}")),
    }
}

fn parse_cors_origins(raw: &str) -> anyhow::Result<CorsOrigins> {
    if raw.trim() == "*" {
        return Ok(CorsOrigins::Any);
    }
    let mut origins = Vec::new();
    for origin in raw.split(',').map(str::trim).filter(|o| !o.is_empty()) {
        HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin '{origin}'"))?;
        origins.push(origin.to_string());
    }
    Ok(CorsOrigins::List(origins))
}
