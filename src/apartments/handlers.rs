use axum::{
    extract::State,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{ApartmentRequest, CreatedResponse, DeletedResponse, RentStats, UpdatedResponse},
    repo_types::Apartment,
    services,
};
use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    extract::{ApiJson, ApiPath},
    state::AppState,
};

// --- routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_apartments))
        .route("/appartement/:num_app", get(get_apartment))
        .route("/stats", get(rent_stats))
}

/// Every handler here takes an `AuthUser`, so each route needs a bearer token.
pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/appartement", post(create_apartment))
        .route("/update/:num_app", put(update_apartment))
        .route("/delete/:num_app", delete(delete_apartment))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_apartments(
    State(state): State<AppState>,
) -> Result<Json<Vec<Apartment>>, AppError> {
    let rows = services::list(state.apartments.as_ref()).await?;
    Ok(Json(rows))
}

/// Answers with a one-element array, which is what the web client reads.
#[instrument(skip(state))]
pub async fn get_apartment(
    State(state): State<AppState>,
    ApiPath(num_app): ApiPath<String>,
) -> Result<Json<Vec<Apartment>>, AppError> {
    let apartment = services::get(state.apartments.as_ref(), &num_app).await?;
    Ok(Json(vec![apartment]))
}

#[instrument(skip(state, auth, payload), fields(user_id = auth.id))]
pub async fn create_apartment(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<ApartmentRequest>,
) -> Result<Json<CreatedResponse>, AppError> {
    let appartement = services::create(state.apartments.as_ref(), payload).await?;
    Ok(Json(CreatedResponse {
        message: "Création réussie".into(),
        appartement,
    }))
}

#[instrument(skip(state, auth, payload), fields(user_id = auth.id))]
pub async fn update_apartment(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(num_app): ApiPath<String>,
    ApiJson(payload): ApiJson<ApartmentRequest>,
) -> Result<Json<UpdatedResponse>, AppError> {
    let data = services::update(state.apartments.as_ref(), &num_app, payload).await?;
    Ok(Json(UpdatedResponse {
        message: "Modification réussie".into(),
        data,
    }))
}

#[instrument(skip(state, auth), fields(user_id = auth.id))]
pub async fn delete_apartment(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(num_app): ApiPath<String>,
) -> Result<Json<DeletedResponse>, AppError> {
    let id = services::delete(state.apartments.as_ref(), &num_app).await?;
    Ok(Json(DeletedResponse {
        message: "Suppression réussie".into(),
        id,
    }))
}

#[instrument(skip(state))]
pub async fn rent_stats(State(state): State<AppState>) -> Result<Json<RentStats>, AppError> {
    let stats = services::stats(state.apartments.as_ref()).await?;
    Ok(Json(stats))
}
