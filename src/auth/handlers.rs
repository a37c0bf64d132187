use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, MessageResponse, ProfileResponse, RegisterRequest,
            UpdateProfileRequest,
        },
        jwt::{AuthUser, JwtKeys},
        services,
    },
    error::AppError,
    extract::ApiJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/update-profile", put(update_profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    services::register(state.users.as_ref(), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Utilisateur créé avec succès".into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let resp = services::login(state.users.as_ref(), &keys, payload).await?;
    Ok(Json(resp))
}

#[instrument(skip(state, auth, payload), fields(user_id = auth.id, username = %auth.username))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = services::update_profile(state.users.as_ref(), auth.id, payload).await?;
    Ok(Json(ProfileResponse {
        message: "Profil mis à jour avec succès".into(),
        user,
    }))
}
