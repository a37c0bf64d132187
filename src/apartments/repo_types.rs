use serde::Serialize;
use sqlx::FromRow;

/// Row of the `appartement` table.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Apartment {
    #[serde(rename = "numApp")]
    pub num_app: String,
    pub design: String,
    pub loyer: f64, // NUMERIC(12,2), read back as float8
}
