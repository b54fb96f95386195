use axum::{extract::State, http::StatusCode, Json};

use crate::auth::accounts::{login, logout, register, AuthResponse, LoginRequest, RegisterRequest};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;
use crate::users::profiles::{get_user, update_profile, ProfileUpdate, ProfileUpdated};

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let response = register(&state.db, req, state.config.session_ttl_hours).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    Ok(Json(
        login(&state.db, req, state.config.session_ttl_hours).await?,
    ))
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<StatusCode, AppError> {
    logout(&state.db, &user.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<User>, AppError> {
    Ok(Json(get_user(&state.db, user.id).await?))
}

/// PUT /api/v1/auth/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ProfileUpdated>, AppError> {
    Ok(Json(update_profile(&state.db, user.id, update).await?))
}
