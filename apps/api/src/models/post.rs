use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

pub const POST_MAX_LEN: usize = 3000;
pub const POST_TITLE_MAX_LEN: usize = 200;
pub const COMMENT_MAX_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "post_type", rename_all = "snake_case")]
pub enum PostType {
    #[default]
    Update,
    Career,
    Document,
    Article,
    Achievement,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "post_visibility", rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Connections,
    Private,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "post_category", rename_all = "snake_case")]
pub enum Category {
    #[default]
    General,
    Technology,
    Business,
    Career,
    Education,
    Networking,
    Job,
    Achievement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Image,
    Document,
    Link,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostAttachment {
    pub kind: AttachmentKind,
    pub url: String,
    pub filename: Option<String>,
    pub file_type: Option<String>,
    pub file_size: Option<u64>,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
}

/// A like or share: one per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub user: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub user: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub likes: Vec<Reaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author: Uuid,
    pub content: String,
    pub post_type: PostType,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub attachments: Vec<PostAttachment>,
    pub visibility: Visibility,
    pub likes: Vec<Reaction>,
    pub comments: Vec<Comment>,
    pub shares: Vec<Reaction>,
    pub is_active: bool,
    pub category: Category,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A `posts` row. Attachments and the embedded interactions are JSONB.
#[derive(Debug, FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub author: Uuid,
    pub content: String,
    pub post_type: PostType,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub attachments: Json<Vec<PostAttachment>>,
    pub visibility: Visibility,
    pub likes: Json<Vec<Reaction>>,
    pub comments: Json<Vec<Comment>>,
    pub shares: Json<Vec<Reaction>>,
    pub is_active: bool,
    pub category: Category,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            author: row.author,
            content: row.content,
            post_type: row.post_type,
            title: row.title,
            tags: row.tags,
            attachments: row.attachments.0,
            visibility: row.visibility,
            likes: row.likes.0,
            comments: row.comments.0,
            shares: row.shares.0,
            is_active: row.is_active,
            category: row.category,
            featured: row.featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Result of a like toggle.
#[derive(Debug, Clone, Serialize)]
pub struct LikeState {
    pub is_liked: bool,
    pub like_count: usize,
}

/// Adds `user`'s reaction or removes it if present. Returns true when now liked.
fn toggle(reactions: &mut Vec<Reaction>, user: Uuid) -> bool {
    if let Some(index) = reactions.iter().position(|r| r.user == user) {
        reactions.remove(index);
        false
    } else {
        reactions.push(Reaction {
            user,
            created_at: Utc::now(),
        });
        true
    }
}

impl Post {
    pub fn toggle_like(&mut self, user: Uuid) -> LikeState {
        let is_liked = toggle(&mut self.likes, user);
        LikeState {
            is_liked,
            like_count: self.likes.len(),
        }
    }

    pub fn has_shared(&self, user: Uuid) -> bool {
        self.shares.iter().any(|s| s.user == user)
    }

    pub fn add_comment(&mut self, user: Uuid, content: &str) -> Result<&Comment, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::validation("Comment content is required"));
        }
        if content.chars().count() > COMMENT_MAX_LEN {
            return Err(AppError::validation(format!(
                "Comment cannot exceed {COMMENT_MAX_LEN} characters"
            )));
        }
        self.comments.push(Comment {
            id: Uuid::new_v4(),
            user,
            content: content.to_string(),
            created_at: Utc::now(),
            likes: vec![],
        });
        let last = self.comments.len() - 1;
        Ok(&self.comments[last])
    }

    pub fn toggle_comment_like(&mut self, comment_id: Uuid, user: Uuid) -> Result<LikeState, AppError> {
        let comment = self
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| AppError::not_found("Comment"))?;
        let is_liked = toggle(&mut comment.likes, user);
        Ok(LikeState {
            is_liked,
            like_count: comment.likes.len(),
        })
    }

    /// Records a share; a user may share a post once. Returns the new share count.
    pub fn share(&mut self, user: Uuid) -> Result<usize, AppError> {
        if self.has_shared(user) {
            return Err(AppError::validation("Post already shared"));
        }
        self.shares.push(Reaction {
            user,
            created_at: Utc::now(),
        });
        Ok(self.shares.len())
    }
}

/// Post with derived interaction counts, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub like_count: usize,
    pub comment_count: usize,
    pub share_count: usize,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        Self {
            like_count: post.likes.len(),
            comment_count: post.comments.len(),
            share_count: post.shares.len(),
            post,
        }
    }
}
