use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::db::like_pattern;
use crate::errors::AppError;
use crate::models::post::{
    Category, Comment, LikeState, Post, PostAttachment, PostRow, PostType, PostView, Visibility,
    POST_MAX_LEN, POST_TITLE_MAX_LEN,
};
use crate::pagination::{Page, PageParams};

/// Shared by the page and count queries of [`list_posts`].
const ACTIVE_POST_FILTER: &str = r#"
    is_active
    AND ($1::text IS NULL
         OR content ILIKE $1 OR title ILIKE $1
         OR EXISTS (SELECT 1 FROM unnest(tags) AS t(tag) WHERE t.tag ILIKE $1))
    AND ($2::post_category IS NULL OR category = $2)
    AND ($3::post_type IS NULL OR post_type = $3)
    AND ($4::uuid IS NULL OR author = $4)
    AND (NOT $5 OR featured)
"#;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostFilter {
    /// Case-insensitive text over content, title and tags.
    pub search: Option<String>,
    pub category: Option<Category>,
    pub post_type: Option<PostType>,
    pub author: Option<Uuid>,
    /// Only featured posts when true; ignored otherwise.
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Deserialize)]
pub struct NewPost {
    pub content: String,
    #[serde(default)]
    pub post_type: PostType,
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<PostAttachment>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub category: Category,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostUpdate {
    pub content: Option<String>,
    pub post_type: Option<PostType>,
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub attachments: Option<Vec<PostAttachment>>,
    pub visibility: Option<Visibility>,
    pub category: Option<Category>,
}

impl PostUpdate {
    /// Validates content and title before writing anything, so a rejected
    /// update leaves `post` unchanged.
    pub fn apply(self, post: &mut Post) -> Result<(), AppError> {
        let content = self.content.as_deref().map(check_content).transpose()?;
        let title = match self.title {
            Some(title) => Some(check_title(Some(title))?),
            None => None,
        };

        if let Some(content) = content {
            post.content = content;
        }
        if let Some(title) = title {
            post.title = title;
        }
        if let Some(post_type) = self.post_type {
            post.post_type = post_type;
        }
        if let Some(tags) = self.tags {
            post.tags = tags;
        }
        if let Some(attachments) = self.attachments {
            post.attachments = attachments;
        }
        if let Some(visibility) = self.visibility {
            post.visibility = visibility;
        }
        if let Some(category) = self.category {
            post.category = category;
        }
        post.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ShareState {
    pub share_count: usize,
}

fn check_content(content: &str) -> Result<String, AppError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::validation("Content is required"));
    }
    if content.chars().count() > POST_MAX_LEN {
        return Err(AppError::validation(format!(
            "Post cannot exceed {POST_MAX_LEN} characters"
        )));
    }
    Ok(content.to_string())
}

fn check_title(title: Option<String>) -> Result<Option<String>, AppError> {
    let title = title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    if title
        .as_deref()
        .is_some_and(|t| t.chars().count() > POST_TITLE_MAX_LEN)
    {
        return Err(AppError::validation(format!(
            "Title cannot exceed {POST_TITLE_MAX_LEN} characters"
        )));
    }
    Ok(title)
}

pub(crate) async fn insert_post(pool: &PgPool, post: &Post) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO posts
            (id, author, content, post_type, title, tags, attachments, visibility,
             likes, comments, shares, is_active, category, featured, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        "#,
    )
    .bind(post.id)
    .bind(post.author)
    .bind(&post.content)
    .bind(post.post_type)
    .bind(&post.title)
    .bind(&post.tags)
    .bind(Json(&post.attachments))
    .bind(post.visibility)
    .bind(Json(&post.likes))
    .bind(Json(&post.comments))
    .bind(Json(&post.shares))
    .bind(post.is_active)
    .bind(post.category)
    .bind(post.featured)
    .bind(post.created_at)
    .bind(post.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

async fn save_post(conn: &mut PgConnection, post: &Post) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE posts
        SET content = $2, post_type = $3, title = $4, tags = $5, attachments = $6,
            visibility = $7, likes = $8, comments = $9, shares = $10, category = $11,
            updated_at = $12
        WHERE id = $1
        "#,
    )
    .bind(post.id)
    .bind(&post.content)
    .bind(post.post_type)
    .bind(&post.title)
    .bind(&post.tags)
    .bind(Json(&post.attachments))
    .bind(post.visibility)
    .bind(Json(&post.likes))
    .bind(Json(&post.comments))
    .bind(Json(&post.shares))
    .bind(post.category)
    .bind(post.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Runs `f` against an active post under a row lock and saves the result.
/// Deactivated posts read as missing.
async fn with_active_post<T>(
    pool: &PgPool,
    post_id: Uuid,
    f: impl FnOnce(&mut Post) -> Result<T, AppError>,
) -> Result<T, AppError> {
    let mut tx = pool.begin().await?;
    let mut post: Post = sqlx::query_as::<_, PostRow>(
        "SELECT * FROM posts WHERE id = $1 AND is_active FOR UPDATE",
    )
    .bind(post_id)
    .fetch_optional(&mut *tx)
    .await?
    .map(Post::from)
    .ok_or_else(|| AppError::not_found("Post"))?;

    let out = f(&mut post)?;
    save_post(&mut tx, &post).await?;
    tx.commit().await?;
    Ok(out)
}

pub async fn list_posts(
    pool: &PgPool,
    filter: &PostFilter,
    params: PageParams,
) -> Result<Page<PostView>, AppError> {
    let search = filter.search.as_deref().and_then(like_pattern);

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM posts WHERE {ACTIVE_POST_FILTER}"
    ))
    .bind(&search)
    .bind(filter.category)
    .bind(filter.post_type)
    .bind(filter.author)
    .bind(filter.featured)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, PostRow>(&format!(
        "SELECT * FROM posts WHERE {ACTIVE_POST_FILTER} \
         ORDER BY created_at DESC, id DESC LIMIT $6 OFFSET $7"
    ))
    .bind(&search)
    .bind(filter.category)
    .bind(filter.post_type)
    .bind(filter.author)
    .bind(filter.featured)
    .bind(params.sql_limit())
    .bind(params.sql_offset())
    .fetch_all(pool)
    .await?;

    let posts: Vec<Post> = rows.into_iter().map(Post::from).collect();
    Ok(Page::from_rows(posts, params, total).map(PostView::from))
}

pub async fn get_post(pool: &PgPool, post_id: Uuid) -> Result<PostView, AppError> {
    sqlx::query_as::<_, PostRow>("SELECT * FROM posts WHERE id = $1 AND is_active")
        .bind(post_id)
        .fetch_optional(pool)
        .await?
        .map(|row| PostView::from(Post::from(row)))
        .ok_or_else(|| AppError::not_found("Post"))
}

pub async fn create_post(pool: &PgPool, author: Uuid, req: NewPost) -> Result<PostView, AppError> {
    let content = check_content(&req.content)?;
    let title = check_title(req.title)?;

    let now = Utc::now();
    let post = Post {
        id: Uuid::new_v4(),
        author,
        content,
        post_type: req.post_type,
        title,
        tags: req
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        attachments: req.attachments,
        visibility: req.visibility,
        likes: vec![],
        comments: vec![],
        shares: vec![],
        is_active: true,
        category: req.category,
        featured: false,
        created_at: now,
        updated_at: now,
    };

    insert_post(pool, &post).await?;
    info!("Post {} created by {author}", post.id);
    Ok(post.into())
}

pub async fn update_post(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
    update: PostUpdate,
) -> Result<PostView, AppError> {
    with_active_post(pool, post_id, |post| {
        if post.author != user_id {
            return Err(AppError::forbidden("Not authorized to update this post"));
        }
        update.apply(post)?;
        Ok(PostView::from(post.clone()))
    })
    .await
}

pub async fn delete_post(pool: &PgPool, post_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    let author: Uuid = sqlx::query_scalar("SELECT author FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Post"))?;
    if author != user_id {
        return Err(AppError::forbidden("Not authorized to delete this post"));
    }

    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post_id)
        .execute(pool)
        .await?;
    info!("Post {post_id} deleted");
    Ok(())
}

pub async fn toggle_like(pool: &PgPool, post_id: Uuid, user_id: Uuid) -> Result<LikeState, AppError> {
    with_active_post(pool, post_id, |post| Ok(post.toggle_like(user_id))).await
}

pub async fn add_comment(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
    content: &str,
) -> Result<Comment, AppError> {
    with_active_post(pool, post_id, |post| post.add_comment(user_id, content).cloned()).await
}

pub async fn toggle_comment_like(
    pool: &PgPool,
    post_id: Uuid,
    comment_id: Uuid,
    user_id: Uuid,
) -> Result<LikeState, AppError> {
    with_active_post(pool, post_id, |post| post.toggle_comment_like(comment_id, user_id)).await
}

pub async fn share(pool: &PgPool, post_id: Uuid, user_id: Uuid) -> Result<ShareState, AppError> {
    with_active_post(pool, post_id, |post| {
        post.share(user_id).map(|share_count| ShareState { share_count })
    })
    .await
}

pub async fn posts_by_user(
    pool: &PgPool,
    author: Uuid,
    params: PageParams,
) -> Result<Page<PostView>, AppError> {
    let filter = PostFilter {
        author: Some(author),
        ..Default::default()
    };
    list_posts(pool, &filter, params).await
}

/// Active posts by engagement (likes + 2 x comments + 3 x shares), ties
/// broken newest first.
pub async fn trending(pool: &PgPool, limit: usize) -> Result<Vec<PostView>, AppError> {
    let limit = i64::try_from(limit.max(1)).unwrap_or(i64::MAX);
    let rows = sqlx::query_as::<_, PostRow>(
        r#"
        SELECT * FROM posts
        WHERE is_active
        ORDER BY jsonb_array_length(likes)
               + 2 * jsonb_array_length(comments)
               + 3 * jsonb_array_length(shares) DESC,
                 created_at DESC,
                 id DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|row| PostView::from(Post::from(row)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::models::post::fixtures::post;
    use crate::users::profiles::seed_user;

    fn new_post(content: &str) -> NewPost {
        NewPost {
            content: content.to_string(),
            post_type: PostType::Update,
            title: None,
            tags: vec![],
            attachments: vec![],
            visibility: Visibility::Public,
            category: Category::General,
        }
    }

    async fn author(pool: &PgPool) -> Uuid {
        seed_user(pool, "writer@x.io", "Writer", &[]).await.id
    }

    async fn insert(pool: &PgPool, p: Post) -> Uuid {
        insert_post(pool, &p).await.unwrap();
        p.id
    }

    #[tokio::test]
    async fn test_create_validates_lengths_before_the_database() {
        let pool = crate::db::unreachable_pool();
        let author = Uuid::new_v4();
        assert!(matches!(
            create_post(&pool, author, new_post("  ")).await.unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            create_post(&pool, author, new_post(&"x".repeat(POST_MAX_LEN + 1)))
                .await
                .unwrap_err(),
            AppError::Validation(_)
        ));
        let mut titled = new_post("body");
        titled.title = Some("t".repeat(POST_TITLE_MAX_LEN + 1));
        assert!(matches!(
            create_post(&pool, author, titled).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[test]
    fn test_rejected_update_leaves_post_untouched() {
        let mut draft = post(Uuid::new_v4(), "Original");
        let err = PostUpdate {
            content: Some("   ".to_string()),
            category: Some(Category::Technology),
            ..Default::default()
        }
        .apply(&mut draft)
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(draft.content, "Original");
        assert_eq!(draft.category, Category::General);

        let err = PostUpdate {
            content: Some("Hijacked".to_string()),
            title: Some("t".repeat(POST_TITLE_MAX_LEN + 1)),
            ..Default::default()
        }
        .apply(&mut draft)
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(draft.content, "Original");
    }

    #[test]
    fn test_blank_title_clears_it() {
        let mut draft = post(Uuid::new_v4(), "body");
        draft.title = Some("Old".to_string());
        PostUpdate {
            title: Some("  ".to_string()),
            ..Default::default()
        }
        .apply(&mut draft)
        .unwrap();
        assert_eq!(draft.title, None);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_create_and_read_back(pool: PgPool) {
        let author = author(&pool).await;
        let view = create_post(&pool, author, new_post(" hello ")).await.unwrap();
        assert_eq!(view.post.content, "hello");
        assert_eq!(view.like_count, 0);
        assert_eq!(get_post(&pool, view.post.id).await.unwrap().post.content, "hello");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_like_toggles(pool: PgPool) {
        let author = author(&pool).await;
        let id = insert(&pool, post(author, "hi")).await;
        let reader = Uuid::new_v4();

        let liked = toggle_like(&pool, id, reader).await.unwrap();
        assert!(liked.is_liked);
        assert_eq!(liked.like_count, 1);
        assert_eq!(get_post(&pool, id).await.unwrap().like_count, 1);
        let unliked = toggle_like(&pool, id, reader).await.unwrap();
        assert!(!unliked.is_liked);
        assert_eq!(unliked.like_count, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_share_once(pool: PgPool) {
        let author = author(&pool).await;
        let id = insert(&pool, post(author, "hi")).await;
        let reader = Uuid::new_v4();
        assert_eq!(share(&pool, id, reader).await.unwrap().share_count, 1);
        assert!(matches!(
            share(&pool, id, reader).await.unwrap_err(),
            AppError::Validation(_)
        ));
        assert_eq!(get_post(&pool, id).await.unwrap().share_count, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_comment_and_comment_like(pool: PgPool) {
        let author = author(&pool).await;
        let id = insert(&pool, post(author, "hi")).await;
        let comment = add_comment(&pool, id, author, "first").await.unwrap();
        let state = toggle_comment_like(&pool, id, comment.id, Uuid::new_v4())
            .await
            .unwrap();
        assert!(state.is_liked);
        assert!(toggle_comment_like(&pool, id, Uuid::new_v4(), author)
            .await
            .is_err());
        assert_eq!(get_post(&pool, id).await.unwrap().comment_count, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_inactive_post_reads_as_missing(pool: PgPool) {
        let author = author(&pool).await;
        let mut hidden = post(author, "hidden");
        hidden.is_active = false;
        let id = insert(&pool, hidden).await;
        assert!(matches!(
            get_post(&pool, id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(toggle_like(&pool, id, author).await.is_err());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_update_and_delete_author_only(pool: PgPool) {
        let author = author(&pool).await;
        let id = insert(&pool, post(author, "draft")).await;
        let stranger = Uuid::new_v4();
        assert!(matches!(
            update_post(&pool, id, stranger, PostUpdate::default())
                .await
                .unwrap_err(),
            AppError::Forbidden(_)
        ));

        let err = update_post(
            &pool,
            id,
            author,
            PostUpdate {
                content: Some("   ".to_string()),
                category: Some(Category::Business),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(get_post(&pool, id).await.unwrap().post.category, Category::General);

        let updated = update_post(
            &pool,
            id,
            author,
            PostUpdate {
                content: Some("final".to_string()),
                category: Some(Category::Technology),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.post.content, "final");
        assert_eq!(updated.post.category, Category::Technology);

        assert!(delete_post(&pool, id, stranger).await.is_err());
        delete_post(&pool, id, author).await.unwrap();
        assert!(get_post(&pool, id).await.is_err());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_list_filters(pool: PgPool) {
        let author = author(&pool).await;
        let other = seed_user(&pool, "other@x.io", "Other", &[]).await.id;
        let mut tagged = post(author, "About systems");
        tagged.tags = vec!["rust".to_string()];
        tagged.featured = true;
        insert(&pool, tagged).await;
        insert(&pool, post(author, "Lunch")).await;
        insert(&pool, post(other, "Rust is nice")).await;

        let search = PostFilter {
            search: Some("RUST".to_string()),
            ..Default::default()
        };
        let page = list_posts(&pool, &search, PageParams::default()).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pagination.total_docs, 2);

        let featured = PostFilter {
            featured: true,
            ..Default::default()
        };
        assert_eq!(
            list_posts(&pool, &featured, PageParams::default()).await.unwrap().items.len(),
            1
        );

        let mine = posts_by_user(&pool, author, PageParams::default()).await.unwrap();
        assert_eq!(mine.items.len(), 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_trending_orders_by_score_then_recency(pool: PgPool) {
        let author = author(&pool).await;
        let mut older = post(author, "older");
        older.created_at = Utc::now() - Duration::hours(2);
        older.toggle_like(Uuid::new_v4());
        older.toggle_like(Uuid::new_v4());
        let mut newer = post(author, "newer");
        newer.toggle_like(Uuid::new_v4());
        newer.toggle_like(Uuid::new_v4());
        let mut shared = post(author, "shared");
        shared.created_at = Utc::now() - Duration::hours(5);
        shared.share(Uuid::new_v4()).unwrap();
        let quiet = post(author, "quiet");
        for p in [older, newer, shared, quiet] {
            insert(&pool, p).await;
        }

        let ranked = trending(&pool, 3).await.unwrap();
        let contents: Vec<&str> = ranked.iter().map(|v| v.post.content.as_str()).collect();
        assert_eq!(contents, vec!["shared", "newer", "older"]);
    }
}
