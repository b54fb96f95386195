use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::db::like_pattern;
use crate::errors::{is_unique_violation, AppError};
use crate::models::connection::ConnectionStatus;
use crate::models::user::{normalize_email, PublicProfile, User, BIO_MAX_LEN};

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), AppError> {
        let email = normalize_email(&self.email);
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::validation("A valid email is required"));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Name is required"));
        }
        if let Some(bio) = &self.bio {
            check_bio(bio)?;
        }
        Ok(())
    }
}

/// Partial profile update. Absent fields are left untouched; skills are merged.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub linkedin_url: Option<String>,
    pub skills: Option<Vec<String>>,
    pub wallet_address: Option<String>,
    pub profile_image: Option<String>,
}

impl ProfileUpdate {
    /// Validates every field before touching `user`, so a rejected update
    /// leaves it unchanged. Returns how many skills were added.
    pub fn apply(self, user: &mut User) -> Result<usize, AppError> {
        if let Some(bio) = &self.bio {
            check_bio(bio)?;
        }
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(AppError::validation("Name cannot be empty"));
        }

        if let Some(name) = self.name {
            user.name = name.trim().to_string();
        }
        if let Some(bio) = self.bio {
            user.bio = bio.trim().to_string();
        }
        if let Some(url) = self.linkedin_url {
            user.linkedin_url = url.trim().to_string();
        }
        if let Some(wallet) = self.wallet_address {
            user.wallet_address = Some(wallet.trim().to_string()).filter(|w| !w.is_empty());
        }
        if let Some(image) = self.profile_image {
            user.profile_image = Some(image.trim().to_string()).filter(|i| !i.is_empty());
        }
        let skills_added = self
            .skills
            .map(|skills| user.merge_skills(&skills))
            .unwrap_or(0);
        user.updated_at = Utc::now();
        Ok(skills_added)
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileUpdated {
    pub user: User,
    pub skills_added: usize,
    pub total_skills: usize,
}

#[derive(Debug, Serialize)]
pub struct UserSearchHit {
    #[serde(flatten)]
    pub profile: PublicProfile,
    pub connection_status: Option<ConnectionStatus>,
    pub connection_id: Option<Uuid>,
}

#[derive(FromRow)]
struct SearchRow {
    #[sqlx(flatten)]
    user: User,
    connection_status: Option<ConnectionStatus>,
    connection_id: Option<Uuid>,
}

fn check_bio(bio: &str) -> Result<(), AppError> {
    if bio.chars().count() > BIO_MAX_LEN {
        return Err(AppError::validation(format!(
            "Bio cannot exceed {BIO_MAX_LEN} characters"
        )));
    }
    Ok(())
}

/// Inserts a new account. Takes a connection so registration can open the
/// first session in the same transaction.
pub async fn create_user(
    conn: &mut PgConnection,
    req: NewUser,
    password_hash: String,
) -> Result<User, AppError> {
    req.validate()?;

    let mut user = User::new(&req.email, &req.name, password_hash);
    if let Some(bio) = req.bio {
        user.bio = bio.trim().to_string();
    }
    user.merge_skills(&req.skills);

    let inserted = sqlx::query(
        r#"
        INSERT INTO users
            (id, email, password_hash, name, bio, linkedin_url, skills,
             wallet_address, profile_image, is_verified, role, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(&user.bio)
    .bind(&user.linkedin_url)
    .bind(&user.skills)
    .bind(&user.wallet_address)
    .bind(&user.profile_image)
    .bind(user.is_verified)
    .bind(user.role)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(&mut *conn)
    .await;

    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict(format!(
                "A user with email {} already exists",
                user.email
            )))
        }
        Err(e) => return Err(e.into()),
    }

    info!("Created user {}", user.id);
    Ok(user)
}

pub async fn get_user(pool: &PgPool, user_id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
    Ok(
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn user_exists(pool: &PgPool, user_id: Uuid) -> Result<bool, AppError> {
    Ok(
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(pool)
            .await?,
    )
}

/// Loads several users at once, keyed by id. Unknown ids are simply absent.
pub async fn users_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<HashMap<Uuid, User>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

pub async fn public_profile(pool: &PgPool, user_id: Uuid) -> Result<PublicProfile, AppError> {
    Ok(get_user(pool, user_id).await?.public_profile())
}

pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    update: ProfileUpdate,
) -> Result<ProfileUpdated, AppError> {
    let mut tx = pool.begin().await?;
    let mut user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let skills_added = update.apply(&mut user)?;

    sqlx::query(
        r#"
        UPDATE users
        SET name = $2, bio = $3, linkedin_url = $4, skills = $5,
            wallet_address = $6, profile_image = $7, updated_at = $8
        WHERE id = $1
        "#,
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.bio)
    .bind(&user.linkedin_url)
    .bind(&user.skills)
    .bind(&user.wallet_address)
    .bind(&user.profile_image)
    .bind(user.updated_at)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("Updated profile of user {user_id} ({skills_added} skills added)");
    Ok(ProfileUpdated {
        total_skills: user.skills.len(),
        skills_added,
        user,
    })
}

/// Case-insensitive search over name, bio and skills, excluding the viewer.
/// An empty query matches everyone.
pub async fn search_users(
    pool: &PgPool,
    viewer: Uuid,
    query: &str,
    limit: usize,
) -> Result<Vec<UserSearchHit>, AppError> {
    let limit = i64::try_from(limit.max(1)).unwrap_or(i64::MAX);
    let rows = sqlx::query_as::<_, SearchRow>(
        r#"
        SELECT u.*, c.status AS connection_status, c.id AS connection_id
        FROM users u
        LEFT JOIN connections c
            ON (c.requester = $1 AND c.recipient = u.id)
            OR (c.recipient = $1 AND c.requester = u.id)
        WHERE u.id <> $1
          AND ($2::text IS NULL
               OR u.name ILIKE $2
               OR u.bio ILIKE $2
               OR EXISTS (SELECT 1 FROM unnest(u.skills) AS s(skill) WHERE s.skill ILIKE $2))
        ORDER BY lower(u.name), u.id
        LIMIT $3
        "#,
    )
    .bind(viewer)
    .bind(like_pattern(query))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| UserSearchHit {
            profile: row.user.public_profile(),
            connection_status: row.connection_status,
            connection_id: row.connection_id,
        })
        .collect())
}

/// Inserts a user with a throwaway hash for database tests.
#[cfg(test)]
pub async fn seed_user(pool: &PgPool, email: &str, name: &str, skills: &[&str]) -> User {
    let mut conn = pool.acquire().await.unwrap();
    create_user(
        &mut conn,
        NewUser {
            email: email.to_string(),
            name: name.to_string(),
            bio: None,
            skills: skills.iter().map(|s| s.to_string()).collect(),
        },
        "not-a-real-hash".to_string(),
    )
    .await
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networking::connections::request_connection;

    fn new_user(email: &str, name: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: name.to_string(),
            bio: None,
            skills: vec![],
        }
    }

    #[test]
    fn test_validate_requires_name_and_email() {
        assert!(matches!(
            new_user("", "Ada").validate().unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            new_user("a@b.c", "  ").validate().unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(new_user("a@b.c", "Ada").validate().is_ok());
    }

    #[test]
    fn test_apply_merges_skills() {
        let mut user = User::new("a@b.c", "Ada", String::new());
        user.merge_skills(&["Rust".to_string()]);

        let added = ProfileUpdate {
            skills: Some(vec!["rust".to_string(), " Go ".to_string()]),
            bio: Some("Systems person".to_string()),
            ..Default::default()
        }
        .apply(&mut user)
        .unwrap();

        assert_eq!(added, 1);
        assert_eq!(user.skills, vec!["Rust", "Go"]);
        assert_eq!(user.bio, "Systems person");
        assert_eq!(user.name, "Ada");
    }

    #[test]
    fn test_rejected_update_leaves_user_untouched() {
        let mut user = User::new("a@b.c", "Ada", String::new());
        let err = ProfileUpdate {
            name: Some("Mallory".to_string()),
            bio: Some("x".repeat(BIO_MAX_LEN + 1)),
            skills: Some(vec!["Go".to_string()]),
            ..Default::default()
        }
        .apply(&mut user)
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(user.name, "Ada");
        assert!(user.skills.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_create_normalizes_email_and_conflicts_case_insensitively(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_user(&mut conn, new_user("  Ada@Example.COM ", "Ada"), "h".into())
            .await
            .unwrap();
        assert_eq!(user.email, "ada@example.com");

        let err = create_user(&mut conn, new_user("ADA@example.com", "Other"), "h".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let found = find_by_email(&pool, "ADA@EXAMPLE.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.password_hash, "h");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_update_profile_persists(pool: PgPool) {
        let user = seed_user(&pool, "a@b.c", "Ada", &["Rust"]).await;
        let updated = update_profile(
            &pool,
            user.id,
            ProfileUpdate {
                skills: Some(vec!["Go".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.total_skills, 2);

        let stored = get_user(&pool, user.id).await.unwrap();
        assert_eq!(stored.skills, vec!["Rust", "Go"]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_rejected_profile_update_is_not_persisted(pool: PgPool) {
        let user = seed_user(&pool, "a@b.c", "Ada", &[]).await;
        let err = update_profile(
            &pool,
            user.id,
            ProfileUpdate {
                name: Some("Mallory".to_string()),
                bio: Some("x".repeat(BIO_MAX_LEN + 1)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(get_user(&pool, user.id).await.unwrap().name, "Ada");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_update_unknown_user(pool: PgPool) {
        let err = update_profile(&pool, Uuid::new_v4(), ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_search_excludes_viewer_and_annotates_connection(pool: PgPool) {
        let viewer = seed_user(&pool, "v@x.io", "Rusty Viewer", &[]).await;
        let zed = seed_user(&pool, "z@x.io", "Zed", &["Rust"]).await;
        let mut conn = pool.acquire().await.unwrap();
        let amy = create_user(
            &mut conn,
            NewUser {
                bio: Some("I write rust".to_string()),
                ..new_user("a@x.io", "Amy")
            },
            "h".into(),
        )
        .await
        .unwrap();
        seed_user(&pool, "n@x.io", "Nobody", &[]).await;

        let request = request_connection(&pool, viewer.id, zed.id, None).await.unwrap();

        let hits = search_users(&pool, viewer.id, "RUST", 10).await.unwrap();
        let ids: Vec<Uuid> = hits.iter().map(|h| h.profile.id).collect();
        assert_eq!(ids, vec![amy.id, zed.id]);
        assert_eq!(hits[0].connection_status, None);
        assert_eq!(hits[1].connection_status, Some(ConnectionStatus::Pending));
        assert_eq!(hits[1].connection_id, Some(request.id));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_search_limit_wildcards_and_empty_query(pool: PgPool) {
        for i in 0..3 {
            seed_user(&pool, &format!("u{i}@x.io"), &format!("Dev {i}"), &[]).await;
        }
        seed_user(&pool, "p@x.io", "100% Dev", &[]).await;
        let viewer = Uuid::new_v4();
        assert_eq!(search_users(&pool, viewer, "dev", 2).await.unwrap().len(), 2);
        assert_eq!(search_users(&pool, viewer, "  ", 10).await.unwrap().len(), 4);
        assert_eq!(search_users(&pool, viewer, "%", 10).await.unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_users_by_ids(pool: PgPool) {
        let a = seed_user(&pool, "a@x.io", "A", &[]).await;
        let b = seed_user(&pool, "b@x.io", "B", &[]).await;
        let found = users_by_ids(&pool, &[a.id, b.id, Uuid::new_v4()]).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[&b.id].name, "B");
        assert!(users_by_ids(&pool, &[]).await.unwrap().is_empty());
        assert!(user_exists(&pool, a.id).await.unwrap());
    }
}
