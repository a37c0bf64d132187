use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::repo_types::Apartment;

/// Body of `POST /appartement` and `PUT /update/:numApp`.
///
/// `numApp` and `loyer` stay loose so a form may send either a JSON number
/// or a string; other shapes get the French validation messages. `design`
/// must be a string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApartmentRequest {
    #[serde(default)]
    pub num_app: Option<Value>,
    #[serde(default)]
    pub design: Option<String>,
    #[serde(default)]
    pub loyer: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub message: String,
    pub appartement: Apartment,
}

#[derive(Debug, Serialize)]
pub struct UpdatedResponse {
    pub message: String,
    pub data: Apartment,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RentBand {
    pub label: &'static str,
    pub count: usize,
}

/// Aggregates over every apartment's rent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RentStats {
    pub count: usize,
    pub total: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub bands: Vec<RentBand>,
}
