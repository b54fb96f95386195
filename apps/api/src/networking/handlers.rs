use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::connection::Connection;
use crate::networking::connections::{
    accept, are_connected, list_connections, pending_for, reject, remove, request_connection,
    ConnectionView,
};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ConnectionRequest {
    pub recipient_id: Uuid,
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct ConnectionStatusResponse {
    pub connected: bool,
}

/// GET /api/v1/connections
pub async fn handle_list_connections(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ConnectionView>>, AppError> {
    Ok(Json(list_connections(&state.db, user.id).await?))
}

/// GET /api/v1/connections/pending
pub async fn handle_pending_connections(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ConnectionView>>, AppError> {
    Ok(Json(pending_for(&state.db, user.id).await?))
}

/// POST /api/v1/connections/request
pub async fn handle_request_connection(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ConnectionRequest>,
) -> Result<(StatusCode, Json<Connection>), AppError> {
    let connection =
        request_connection(&state.db, user.id, req.recipient_id, req.message.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(connection)))
}

/// PUT /api/v1/connections/:id/accept
pub async fn handle_accept_connection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Connection>, AppError> {
    Ok(Json(accept(&state.db, id, user.id).await?))
}

/// PUT /api/v1/connections/:id/reject
pub async fn handle_reject_connection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Connection>, AppError> {
    Ok(Json(reject(&state.db, id, user.id).await?))
}

/// DELETE /api/v1/connections/:id
pub async fn handle_remove_connection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    remove(&state.db, id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/connections/status/:user_id
pub async fn handle_connection_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(other): Path<Uuid>,
) -> Result<Json<ConnectionStatusResponse>, AppError> {
    Ok(Json(ConnectionStatusResponse {
        connected: are_connected(&state.db, user.id, other).await?,
    }))
}
