//! Opaque bearer tokens backed by the `sessions` table.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    #[serde(skip)]
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// 32 hex chars of uuid plus 32 hex chars of OS randomness.
pub fn generate_token() -> String {
    let mut random = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut random);
    let tail: String = random.iter().map(|b| format!("{b:02x}")).collect();
    format!("{}{tail}", Uuid::new_v4().simple())
}

pub async fn create_session(
    conn: &mut PgConnection,
    user_id: Uuid,
    ttl_hours: i64,
) -> Result<Session, sqlx::Error> {
    let now = Utc::now();
    let session = Session {
        token: generate_token(),
        user_id,
        expires_at: now + Duration::hours(ttl_hours),
    };

    sqlx::query(
        "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(&session.token)
    .bind(user_id)
    .bind(now)
    .bind(session.expires_at)
    .execute(&mut *conn)
    .await?;

    info!("Opened session for user {user_id}");
    Ok(session)
}

/// The user behind a live token, or `None` for unknown and expired tokens.
pub async fn resolve(pool: &PgPool, token: &str) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT user_id FROM sessions WHERE token = $1 AND expires_at > NOW()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await
}

pub async fn revoke(pool: &PgPool, token: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Drops a user's expired sessions. Run on every login so the table does
/// not grow without bound.
pub async fn purge_expired(conn: &mut PgConnection, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND expires_at <= NOW()")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() > 0 {
        debug!(
            "Purged {} expired sessions for user {user_id}",
            result.rows_affected()
        );
    }
    Ok(result.rows_affected())
}
