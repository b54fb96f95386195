use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::messaging::threads::{
    conversation, conversations, delete_message, mark_read, send_message, unread_count,
    ConversationPage, ConversationSummary, NewMessage,
};
use crate::models::message::Message;
use crate::pagination::PageParams;
use crate::state::AppState;

const DEFAULT_THREAD_PAGE: usize = 50;

#[derive(Deserialize)]
pub struct ThreadQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub unread_count: usize,
}

#[derive(Serialize)]
pub struct MarkedReadResponse {
    pub marked: usize,
}

/// GET /api/v1/messages/conversations
pub async fn handle_conversations(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ConversationSummary>>, AppError> {
    Ok(Json(conversations(&state.db, user.id).await?))
}

/// GET /api/v1/messages/conversation/:user_id
pub async fn handle_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(other): Path<Uuid>,
    Query(query): Query<ThreadQuery>,
) -> Result<Json<ConversationPage>, AppError> {
    let params = PageParams {
        page: query.page,
        limit: query.limit.or(Some(DEFAULT_THREAD_PAGE)),
    };
    Ok(Json(conversation(&state.db, user.id, other, params).await?))
}

/// POST /api/v1/messages/send
pub async fn handle_send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<NewMessage>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let message = send_message(&state.db, user.id, req).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// PUT /api/v1/messages/read/:conversation_id
pub async fn handle_mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
) -> Result<Json<MarkedReadResponse>, AppError> {
    let marked = mark_read(&state.db, user.id, &conversation_id).await?;
    Ok(Json(MarkedReadResponse { marked }))
}

/// GET /api/v1/messages/unread-count
pub async fn handle_unread_count(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UnreadCountResponse>, AppError> {
    Ok(Json(UnreadCountResponse {
        unread_count: unread_count(&state.db, user.id).await?,
    }))
}

/// DELETE /api/v1/messages/:id
pub async fn handle_delete_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    delete_message(&state.db, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
