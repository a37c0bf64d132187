use serde_json::Value;
use tracing::{info, warn};

use super::{
    dto::{ApartmentRequest, RentBand, RentStats},
    repo::ApartmentStore,
    repo_types::Apartment,
};
use crate::{db::RepoError, error::AppError};

const NOT_FOUND: &str = "Appartement non trouvé";
const DUPLICATE: &str = "Ce numéro d'appartement existe déjà";
const CREATE_MISSING: &str = "Numéro d'appartement, design et loyer sont requis";
const UPDATE_MISSING: &str = "Tous les champs sont obligatoires";

const MAX_NUM_APP_LEN: usize = 50;
const MAX_DESIGN_LEN: usize = 255;
// Largest value a NUMERIC(12,2) column holds.
const MAX_LOYER: f64 = 9_999_999_999.99;

const RENT_BANDS: [(&str, f64, f64); 3] = [
    ("Bas (<1k Ar)", 0.0, 1_000.0),
    ("Moyen (1k-5k Ar)", 1_000.0, 5_000.0),
    ("Élevé (>5k Ar)", 5_000.0, f64::INFINITY),
];

/// Reads `loyer` the way a form submits it: a JSON number or a numeric string.
pub fn parse_loyer(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    raw.is_finite().then_some(raw)
}

/// Reads `numApp` as a string, or a number written back in decimal.
pub fn parse_num_app(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn round_to_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn require_key(num_app: &str) -> Result<&str, AppError> {
    let key = num_app.trim();
    if key.is_empty() || key.chars().any(char::is_control) {
        return Err(AppError::invalid("Numéro d'appartement invalide"));
    }
    Ok(key)
}

fn validate(payload: ApartmentRequest, missing: &str) -> Result<Apartment, AppError> {
    let (Some(num_app), Some(design), Some(loyer)) = (
        payload
            .num_app
            .and_then(parse_num_app)
            .filter(|n| !n.is_empty()),
        payload.design.filter(|d| !d.trim().is_empty()),
        payload.loyer.filter(|l| !l.is_null()),
    ) else {
        return Err(AppError::invalid(missing));
    };

    let num_app = num_app.trim();
    if num_app.is_empty() {
        return Err(AppError::invalid(
            "Le numéro d'appartement ne peut pas être vide",
        ));
    }
    if num_app.chars().any(char::is_control) {
        return Err(AppError::invalid(
            "Le numéro d'appartement contient des caractères non autorisés",
        ));
    }
    if num_app.chars().count() > MAX_NUM_APP_LEN {
        return Err(AppError::invalid(
            "Le numéro d'appartement ne doit pas dépasser 50 caractères",
        ));
    }
    if design.chars().count() > MAX_DESIGN_LEN {
        return Err(AppError::invalid(
            "Le design ne doit pas dépasser 255 caractères",
        ));
    }

    if design
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    {
        return Err(AppError::invalid(
            "Le design contient des caractères non autorisés",
        ));
    }

    let loyer = parse_loyer(&loyer)
        .map(round_to_cents)
        .filter(|l| *l > 0.0)
        .ok_or_else(|| AppError::invalid("Le loyer doit être un nombre positif"))?;
    if loyer > MAX_LOYER {
        return Err(AppError::invalid(
            "Le loyer dépasse la valeur maximale autorisée",
        ));
    }

    Ok(Apartment {
        num_app: num_app.to_string(),
        design,
        loyer,
    })
}

fn duplicate_as_conflict(e: RepoError) -> AppError {
    match e {
        RepoError::UniqueViolation => AppError::Conflict(DUPLICATE.into()),
        other => other.into(),
    }
}

pub async fn list(store: &dyn ApartmentStore) -> Result<Vec<Apartment>, AppError> {
    let rows = store.list().await?;
    info!(count = rows.len(), "apartments listed");
    Ok(rows)
}

pub async fn get(store: &dyn ApartmentStore, num_app: &str) -> Result<Apartment, AppError> {
    let key = require_key(num_app)?;
    store
        .find(key)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))
}

pub async fn create(
    store: &dyn ApartmentStore,
    payload: ApartmentRequest,
) -> Result<Apartment, AppError> {
    let apartment = validate(payload, CREATE_MISSING)?;

    if store.find(&apartment.num_app).await?.is_some() {
        warn!(num_app = %apartment.num_app, "apartment number already exists");
        return Err(AppError::Conflict(DUPLICATE.into()));
    }

    let stored = store
        .insert(&apartment)
        .await
        .map_err(duplicate_as_conflict)?;
    info!(num_app = %stored.num_app, loyer = stored.loyer, "apartment created");
    Ok(stored)
}

pub async fn update(
    store: &dyn ApartmentStore,
    old_key: &str,
    payload: ApartmentRequest,
) -> Result<Apartment, AppError> {
    let old_key = require_key(old_key)?;
    let apartment = validate(payload, UPDATE_MISSING)?;

    if apartment.num_app != old_key && store.find(&apartment.num_app).await?.is_some() {
        warn!(old_key, num_app = %apartment.num_app, "rename target already exists");
        return Err(AppError::Conflict(DUPLICATE.into()));
    }

    let updated = store
        .update(old_key, &apartment)
        .await
        .map_err(duplicate_as_conflict)?
        .ok_or_else(|| {
            warn!(old_key, "apartment to update not found");
            AppError::NotFound(NOT_FOUND.into())
        })?;
    info!(old_key, num_app = %updated.num_app, "apartment updated");
    Ok(updated)
}

pub async fn delete(store: &dyn ApartmentStore, num_app: &str) -> Result<String, AppError> {
    let key = require_key(num_app)?;

    if store.find(key).await?.is_none() || !store.delete(key).await? {
        warn!(num_app = key, "apartment to delete not found");
        return Err(AppError::NotFound(NOT_FOUND.into()));
    }
    info!(num_app = key, "apartment deleted");
    Ok(key.to_string())
}

pub async fn stats(store: &dyn ApartmentStore) -> Result<RentStats, AppError> {
    let rows = store.list().await?;
    Ok(compute_stats(&rows))
}

pub fn compute_stats(rows: &[Apartment]) -> RentStats {
    let bands = RENT_BANDS
        .iter()
        .map(|&(label, low, high)| RentBand {
            label,
            count: rows
                .iter()
                .filter(|a| a.loyer >= low && a.loyer < high)
                .count(),
        })
        .collect();

    if rows.is_empty() {
        return RentStats {
            count: 0,
            total: 0.0,
            average: 0.0,
            min: 0.0,
            max: 0.0,
            bands,
        };
    }

    let total: f64 = rows.iter().map(|a| a.loyer).sum();
    let min = rows.iter().map(|a| a.loyer).fold(f64::INFINITY, f64::min);
    let max = rows.iter().map(|a| a.loyer).fold(f64::NEG_INFINITY, f64::max);
    RentStats {
        count: rows.len(),
        total,
        average: total / rows.len() as f64,
        min,
        max,
        bands,
    }
}
