use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::post::{Category, Comment, LikeState, PostType, PostView};
use crate::pagination::{Page, PageParams};
use crate::posts::feed::{
    add_comment, create_post, delete_post, get_post, list_posts, posts_by_user, share,
    toggle_comment_like, toggle_like, trending, update_post, NewPost, PostFilter, PostUpdate,
    ShareState,
};
use crate::state::AppState;

const DEFAULT_TRENDING_LIMIT: usize = 10;

#[derive(Deserialize)]
pub struct PostListQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub search: Option<String>,
    pub category: Option<Category>,
    pub post_type: Option<PostType>,
    pub author: Option<Uuid>,
    pub featured: Option<bool>,
}

#[derive(Deserialize)]
pub struct TrendingQuery {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

/// GET /api/v1/posts
pub async fn handle_list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<Page<PostView>>, AppError> {
    let filter = PostFilter {
        search: query.search,
        category: query.category,
        post_type: query.post_type,
        author: query.author,
        featured: query.featured.unwrap_or(false),
    };
    let params = PageParams {
        page: query.page,
        limit: query.limit,
    };
    Ok(Json(list_posts(&state.db, &filter, params).await?))
}

/// POST /api/v1/posts
pub async fn handle_create_post(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<NewPost>,
) -> Result<(StatusCode, Json<PostView>), AppError> {
    let view = create_post(&state.db, user.id, req).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/posts/trending
pub async fn handle_trending(
    State(state): State<AppState>,
    Query(query): Query<TrendingQuery>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_TRENDING_LIMIT);
    Ok(Json(trending(&state.db, limit).await?))
}

/// GET /api/v1/posts/user/:user_id
pub async fn handle_posts_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<PostView>>, AppError> {
    Ok(Json(posts_by_user(&state.db, user_id, params).await?))
}

/// GET /api/v1/posts/:id
pub async fn handle_get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostView>, AppError> {
    Ok(Json(get_post(&state.db, id).await?))
}

/// PUT /api/v1/posts/:id
pub async fn handle_update_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(update): Json<PostUpdate>,
) -> Result<Json<PostView>, AppError> {
    Ok(Json(update_post(&state.db, id, user.id, update).await?))
}

/// DELETE /api/v1/posts/:id
pub async fn handle_delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    delete_post(&state.db, id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/posts/:id/like
pub async fn handle_toggle_like(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeState>, AppError> {
    Ok(Json(toggle_like(&state.db, id, user.id).await?))
}

/// POST /api/v1/posts/:id/comment
pub async fn handle_add_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let comment = add_comment(&state.db, id, user.id, &req.content).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// POST /api/v1/posts/:id/comments/:comment_id/like
pub async fn handle_toggle_comment_like(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<LikeState>, AppError> {
    Ok(Json(
        toggle_comment_like(&state.db, id, comment_id, user.id).await?,
    ))
}

/// POST /api/v1/posts/:id/share
pub async fn handle_share(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ShareState>, AppError> {
    Ok(Json(share(&state.db, id, user.id).await?))
}
