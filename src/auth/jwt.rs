use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use super::claims::Claims;
use crate::{config::JwtConfig, error::AppError, state::AppState};

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(
                u64::try_from(cfg.ttl_hours)
                    .unwrap_or(0)
                    .saturating_mul(3600),
            ),
        }
    }

    pub fn sign(&self, user_id: i32, username: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|secs| now.checked_add(TimeDuration::seconds(secs)))
            .ok_or_else(|| anyhow::anyhow!("token lifetime out of range"))?;
        let claims = Claims {
            id: user_id,
            username: username.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = data.claims.id, "jwt verified");
        Ok(data.claims)
    }
}

/// Identity carried by a verified bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Token manquant".into()))?;

        let (scheme, token) = header.split_once(' ').unwrap_or((header, ""));
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Unauthorized("Token manquant".into()));
        }
        if !scheme.eq_ignore_ascii_case("bearer") {
            warn!(scheme, "unsupported authorization scheme");
            return Err(AppError::Forbidden("Token invalide".into()));
        }

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Forbidden("Token invalide".into())
        })?;

        Ok(AuthUser {
            id: claims.id,
            username: claims.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_hours: 24,
        })
    }

    #[test]
    fn sign_and_verify_token() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let token = keys.sign(7, "rija").expect("sign");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.id, 7);
        assert_eq!(claims.username, "rija");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good_keys = make_keys("same-secret", "good-iss", "good-aud");
        let bad_keys = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good_keys.sign(1, "a").expect("sign");
        assert!(bad_keys.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_other_secret() {
        let keys = make_keys("secret-a", "iss", "aud");
        let other = make_keys("secret-b", "iss", "aud");
        let token = keys.sign(1, "a").expect("sign");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys.sign(1, "alice").expect("sign");
        let forged = keys.sign(2, "mallory").expect("sign");

        let original: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let spliced = format!("{}.{}.{}", original[0], forged_parts[1], original[2]);
        assert!(keys.verify(&spliced).is_err());
    }

    #[test]
    fn verify_rejects_tampered_signature() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys.sign(1, "alice").expect("sign");
        let (head, sig) = token.rsplit_once('.').expect("three parts");
        let flipped: String = sig
            .chars()
            .rev()
            .collect();
        assert_ne!(flipped, sig);
        assert!(keys.verify(&format!("{head}.{flipped}")).is_err());
    }

    #[test]
    fn oversized_lifetime_fails_to_sign_instead_of_panicking() {
        let keys = JwtKeys::from_config(&JwtConfig {
            secret: "dev-secret".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            ttl_hours: 9_000_000_000_000_000,
        });
        assert!(keys.sign(1, "alice").is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let past = OffsetDateTime::now_utc() - TimeDuration::hours(48);
        let claims = Claims {
            id: 1,
            username: "alice".into(),
            iat: past.unix_timestamp() as usize,
            exp: (past + TimeDuration::hours(24)).unix_timestamp() as usize,
            iss: "iss".into(),
            aud: "aud".into(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert!(keys.verify(&token).is_err());
    }
}
