use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::auth::password::{check_password, hash_off_thread, verify_off_thread};
use crate::auth::sessions::{create_session, purge_expired, revoke, Session};
use crate::errors::AppError;
use crate::models::user::User;
use crate::users::profiles::{create_user, find_by_email, NewUser};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub password: String,
    #[serde(flatten)]
    pub user: NewUser,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub session: Session,
    pub user: User,
}

/// Creates the account and its first session atomically.
pub async fn register(
    pool: &PgPool,
    req: RegisterRequest,
    ttl_hours: i64,
) -> Result<AuthResponse, AppError> {
    check_password(&req.password)?;
    req.user.validate()?;
    let hash = hash_off_thread(req.password).await?;

    let mut tx = pool.begin().await?;
    let user = create_user(&mut tx, req.user, hash).await?;
    let session = create_session(&mut tx, user.id, ttl_hours).await?;
    tx.commit().await?;

    info!("Registered user {}", user.id);
    Ok(AuthResponse { session, user })
}

/// Unknown email and wrong password produce the same error.
pub async fn login(
    pool: &PgPool,
    req: LoginRequest,
    ttl_hours: i64,
) -> Result<AuthResponse, AppError> {
    let invalid = || AppError::unauthorized("Invalid email or password");

    let Some(user) = find_by_email(pool, &req.email).await? else {
        warn!("Login attempt for unknown email");
        return Err(invalid());
    };
    if !verify_off_thread(req.password, user.password_hash.clone()).await? {
        warn!("Failed login for user {}", user.id);
        return Err(invalid());
    }

    let mut tx = pool.begin().await?;
    purge_expired(&mut tx, user.id).await?;
    let session = create_session(&mut tx, user.id, ttl_hours).await?;
    tx.commit().await?;

    info!("User {} logged in", user.id);
    Ok(AuthResponse { session, user })
}

pub async fn logout(pool: &PgPool, token: &str) -> Result<(), AppError> {
    if revoke(pool, token).await? {
        info!("Session revoked");
    }
    Ok(())
}
