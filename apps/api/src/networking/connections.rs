use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::{is_unique_violation, AppError};
use crate::models::connection::{Connection, ConnectionStatus, CONNECTION_MESSAGE_MAX_LEN};
use crate::models::user::{PublicProfile, User};
use crate::users::profiles::{user_exists, users_by_ids};

/// A connection as seen from one of its two sides.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionView {
    pub id: Uuid,
    pub other_user: Option<PublicProfile>,
    pub status: ConnectionStatus,
    pub message: String,
    pub is_requester: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConnectionView {
    fn new(connection: Connection, profiles: &HashMap<Uuid, User>, viewer: Uuid) -> Self {
        Self {
            id: connection.id,
            other_user: profiles
                .get(&connection.other_user(viewer))
                .map(User::public_profile),
            status: connection.status,
            is_requester: connection.requester == viewer,
            message: connection.message,
            created_at: connection.created_at,
            updated_at: connection.updated_at,
        }
    }
}

/// Attaches the other side's profile to each record.
async fn views(
    pool: &PgPool,
    connections: Vec<Connection>,
    viewer: Uuid,
) -> Result<Vec<ConnectionView>, AppError> {
    let others: Vec<Uuid> = connections.iter().map(|c| c.other_user(viewer)).collect();
    let profiles = users_by_ids(pool, &others).await?;
    Ok(connections
        .into_iter()
        .map(|c| ConnectionView::new(c, &profiles, viewer))
        .collect())
}

/// The record linking `a` and `b`, in either direction.
pub async fn connection_between(
    pool: &PgPool,
    a: Uuid,
    b: Uuid,
) -> Result<Option<Connection>, AppError> {
    Ok(sqlx::query_as::<_, Connection>(
        r#"
        SELECT * FROM connections
        WHERE (requester = $1 AND recipient = $2)
           OR (requester = $2 AND recipient = $1)
        "#,
    )
    .bind(a)
    .bind(b)
    .fetch_optional(pool)
    .await?)
}

pub async fn request_connection(
    pool: &PgPool,
    requester: Uuid,
    recipient: Uuid,
    message: Option<&str>,
) -> Result<Connection, AppError> {
    if requester == recipient {
        return Err(AppError::validation("Cannot connect with yourself"));
    }
    if message.is_some_and(|m| m.trim().chars().count() > CONNECTION_MESSAGE_MAX_LEN) {
        return Err(AppError::validation(format!(
            "Connection message cannot exceed {CONNECTION_MESSAGE_MAX_LEN} characters"
        )));
    }

    if !user_exists(pool, recipient).await? {
        return Err(AppError::not_found("User"));
    }
    if let Some(existing) = connection_between(pool, requester, recipient).await? {
        return Err(AppError::validation(format!(
            "Connection request already exists (status: {:?})",
            existing.status
        )));
    }

    let connection = Connection::new(requester, recipient, message);
    let inserted = sqlx::query(
        r#"
        INSERT INTO connections (id, requester, recipient, status, message, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(connection.id)
    .bind(connection.requester)
    .bind(connection.recipient)
    .bind(connection.status)
    .bind(&connection.message)
    .bind(connection.created_at)
    .bind(connection.updated_at)
    .execute(pool)
    .await;

    match inserted {
        Ok(_) => {}
        // lost a race with a concurrent request for the same pair
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::validation("Connection request already exists"))
        }
        Err(e) => return Err(e.into()),
    }

    info!("Connection requested: {requester} -> {recipient}");
    Ok(connection)
}

/// Accepts or rejects a pending request. Only the recipient may answer.
pub async fn respond_to_request(
    pool: &PgPool,
    connection_id: Uuid,
    user_id: Uuid,
    accept: bool,
) -> Result<Connection, AppError> {
    let mut tx = pool.begin().await?;
    let mut connection =
        sqlx::query_as::<_, Connection>("SELECT * FROM connections WHERE id = $1 FOR UPDATE")
            .bind(connection_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Connection request"))?;
    if connection.recipient != user_id {
        return Err(AppError::forbidden(
            "Not authorized to answer this connection request",
        ));
    }
    if connection.status != ConnectionStatus::Pending {
        return Err(AppError::validation("Connection request is not pending"));
    }

    connection.status = if accept {
        ConnectionStatus::Accepted
    } else {
        ConnectionStatus::Rejected
    };
    connection.updated_at = Utc::now();

    sqlx::query("UPDATE connections SET status = $2, updated_at = $3 WHERE id = $1")
        .bind(connection.id)
        .bind(connection.status)
        .bind(connection.updated_at)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Connection {connection_id} {:?}", connection.status);
    Ok(connection)
}

pub async fn accept(pool: &PgPool, connection_id: Uuid, user_id: Uuid) -> Result<Connection, AppError> {
    respond_to_request(pool, connection_id, user_id, true).await
}

pub async fn reject(pool: &PgPool, connection_id: Uuid, user_id: Uuid) -> Result<Connection, AppError> {
    respond_to_request(pool, connection_id, user_id, false).await
}

/// Deletes the connection record. Either party may remove it.
pub async fn remove(pool: &PgPool, connection_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    let connection = sqlx::query_as::<_, Connection>("SELECT * FROM connections WHERE id = $1")
        .bind(connection_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Connection"))?;
    if !connection.involves(user_id) {
        return Err(AppError::forbidden(
            "Not authorized to remove this connection",
        ));
    }

    sqlx::query("DELETE FROM connections WHERE id = $1")
        .bind(connection_id)
        .execute(pool)
        .await?;
    info!("Connection {connection_id} removed by {user_id}");
    Ok(())
}

/// Every connection record involving the viewer, most recently updated first.
pub async fn list_connections(pool: &PgPool, viewer: Uuid) -> Result<Vec<ConnectionView>, AppError> {
    let connections = sqlx::query_as::<_, Connection>(
        r#"
        SELECT * FROM connections
        WHERE requester = $1 OR recipient = $1
        ORDER BY updated_at DESC, id DESC
        "#,
    )
    .bind(viewer)
    .fetch_all(pool)
    .await?;
    views(pool, connections, viewer).await
}

/// Requests awaiting the viewer's answer, newest first.
pub async fn pending_for(pool: &PgPool, viewer: Uuid) -> Result<Vec<ConnectionView>, AppError> {
    let connections = sqlx::query_as::<_, Connection>(
        r#"
        SELECT * FROM connections
        WHERE recipient = $1 AND status = 'pending'
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(viewer)
    .fetch_all(pool)
    .await?;
    views(pool, connections, viewer).await
}

pub async fn are_connected(pool: &PgPool, a: Uuid, b: Uuid) -> Result<bool, AppError> {
    Ok(connection_between(pool, a, b)
        .await?
        .is_some_and(|c| c.is_active()))
}

/// Creates an accepted connection between two users for database tests.
#[cfg(test)]
pub async fn seed_connection(pool: &PgPool, a: Uuid, b: Uuid) -> Connection {
    let request = request_connection(pool, a, b, None).await.unwrap();
    accept(pool, request.id, b).await.unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::profiles::seed_user;

    async fn users(pool: &PgPool, n: usize) -> Vec<Uuid> {
        let mut ids = Vec::new();
        for i in 0..n {
            ids.push(seed_user(pool, &format!("u{i}@x.io"), &format!("User {i}"), &[]).await.id);
        }
        ids
    }

    #[tokio::test]
    async fn test_request_validation_precedes_database() {
        let pool = crate::db::unreachable_pool();
        let me = Uuid::new_v4();
        assert!(matches!(
            request_connection(&pool, me, me, None).await.unwrap_err(),
            AppError::Validation(_)
        ));
        let long = "x".repeat(CONNECTION_MESSAGE_MAX_LEN + 1);
        assert!(matches!(
            request_connection(&pool, me, Uuid::new_v4(), Some(&long))
                .await
                .unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_request_and_accept(pool: PgPool) {
        let ids = users(&pool, 2).await;
        let conn = request_connection(&pool, ids[0], ids[1], Some(" hi ")).await.unwrap();
        assert_eq!(conn.message, "hi");
        assert!(!are_connected(&pool, ids[0], ids[1]).await.unwrap());

        let err = accept(&pool, conn.id, ids[0]).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let accepted = accept(&pool, conn.id, ids[1]).await.unwrap();
        assert_eq!(accepted.status, ConnectionStatus::Accepted);
        assert!(are_connected(&pool, ids[1], ids[0]).await.unwrap());

        let err = reject(&pool, conn.id, ids[1]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_request_rules(pool: PgPool) {
        let ids = users(&pool, 2).await;
        assert!(matches!(
            request_connection(&pool, ids[0], Uuid::new_v4(), None)
                .await
                .unwrap_err(),
            AppError::NotFound(_)
        ));

        request_connection(&pool, ids[0], ids[1], None).await.unwrap();
        // the reverse direction counts as the same pair
        let err = request_connection(&pool, ids[1], ids[0], None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_pair_index_rejects_reverse_duplicate(pool: PgPool) {
        let ids = users(&pool, 2).await;
        request_connection(&pool, ids[0], ids[1], None).await.unwrap();
        let reverse = Connection::new(ids[1], ids[0], None);
        let err = sqlx::query(
            "INSERT INTO connections (id, requester, recipient) VALUES ($1, $2, $3)",
        )
        .bind(reverse.id)
        .bind(reverse.requester)
        .bind(reverse.recipient)
        .execute(&pool)
        .await
        .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_list_and_pending_views(pool: PgPool) {
        let ids = users(&pool, 3).await;
        let first = request_connection(&pool, ids[1], ids[0], None).await.unwrap();
        request_connection(&pool, ids[0], ids[2], None).await.unwrap();
        accept(&pool, first.id, ids[0]).await.unwrap();

        let listed = list_connections(&pool, ids[0]).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert!(!listed[0].is_requester);
        assert_eq!(listed[0].other_user.as_ref().map(|u| u.id), Some(ids[1]));

        assert!(pending_for(&pool, ids[0]).await.unwrap().is_empty());
        let pending = pending_for(&pool, ids[2]).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].other_user.as_ref().map(|u| u.id), Some(ids[0]));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_remove_either_party(pool: PgPool) {
        let ids = users(&pool, 3).await;
        let conn = request_connection(&pool, ids[0], ids[1], None).await.unwrap();
        assert!(matches!(
            remove(&pool, conn.id, ids[2]).await.unwrap_err(),
            AppError::Forbidden(_)
        ));
        remove(&pool, conn.id, ids[1]).await.unwrap();
        assert!(list_connections(&pool, ids[0]).await.unwrap().is_empty());
    }
}
