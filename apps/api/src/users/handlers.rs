use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::PublicProfile;
use crate::state::AppState;
use crate::users::profiles::{public_profile, search_users, UserSearchHit};

const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

/// GET /api/v1/users/:id
pub async fn handle_get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicProfile>, AppError> {
    Ok(Json(public_profile(&state.db, id).await?))
}

/// GET /api/v1/users/search
pub async fn handle_search_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<UserSearchHit>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    Ok(Json(search_users(&state.db, user.id, &params.q, limit).await?))
}
