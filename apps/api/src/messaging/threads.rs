use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::messaging::conversation::{conversation_id, participants};
use crate::models::message::{Attachment, Message, MessageType, MESSAGE_MAX_LEN};
use crate::models::user::{PublicProfile, User};
use crate::networking::connections::are_connected;
use crate::pagination::PageParams;
use crate::users::profiles::users_by_ids;

#[derive(Debug, Deserialize)]
pub struct NewMessage {
    pub recipient_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    pub attachment: Option<Attachment>,
}

/// One page of a thread, oldest message first.
#[derive(Debug, Serialize)]
pub struct ConversationPage {
    pub conversation_id: String,
    pub messages: Vec<Message>,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub other_user: Option<PublicProfile>,
    pub last_message: Message,
    pub unread_count: usize,
}

fn not_connected() -> AppError {
    AppError::forbidden("You can only message connected users")
}

fn count(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

pub(crate) async fn insert_message(pool: &PgPool, message: &Message) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO messages
            (id, sender, recipient, content, message_type, attachment,
             is_read, read_at, conversation_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(message.id)
    .bind(message.sender)
    .bind(message.recipient)
    .bind(&message.content)
    .bind(message.message_type)
    .bind(&message.attachment)
    .bind(message.is_read)
    .bind(message.read_at)
    .bind(&message.conversation_id)
    .bind(message.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Flags the viewer's unread messages in the thread. Returns how many changed.
async fn mark_thread_read(pool: &PgPool, conversation_id: &str, viewer: Uuid) -> Result<usize, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE messages SET is_read = TRUE, read_at = NOW()
        WHERE conversation_id = $1 AND recipient = $2 AND NOT is_read
        "#,
    )
    .bind(conversation_id)
    .bind(viewer)
    .execute(pool)
    .await?;
    Ok(usize::try_from(result.rows_affected()).unwrap_or(usize::MAX))
}

pub async fn send_message(pool: &PgPool, sender: Uuid, req: NewMessage) -> Result<Message, AppError> {
    if req.recipient_id == sender {
        return Err(AppError::validation("Cannot send a message to yourself"));
    }
    let content = req.content.trim();
    if content.is_empty() {
        return Err(AppError::validation("Message content is required"));
    }
    if content.chars().count() > MESSAGE_MAX_LEN {
        return Err(AppError::validation(format!(
            "Message cannot exceed {MESSAGE_MAX_LEN} characters"
        )));
    }

    if !are_connected(pool, sender, req.recipient_id).await? {
        return Err(not_connected());
    }

    let message = Message {
        id: Uuid::new_v4(),
        sender,
        recipient: req.recipient_id,
        content: content.to_string(),
        message_type: req.message_type,
        attachment: req.attachment.map(Json),
        is_read: false,
        read_at: None,
        conversation_id: conversation_id(sender, req.recipient_id),
        created_at: Utc::now(),
    };
    insert_message(pool, &message).await?;
    debug!("Message {} sent in {}", message.id, message.conversation_id);
    Ok(message)
}

/// Returns one page of the thread with `other` (newest page first, each page
/// ordered oldest-first) and marks the viewer's unread messages in it read.
/// Messages sharing a timestamp are ordered by id so pages never overlap.
pub async fn conversation(
    pool: &PgPool,
    viewer: Uuid,
    other: Uuid,
    params: PageParams,
) -> Result<ConversationPage, AppError> {
    if !are_connected(pool, viewer, other).await? {
        return Err(not_connected());
    }

    let id = conversation_id(viewer, other);
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = $1")
        .bind(&id)
        .fetch_one(pool)
        .await?;

    let mut messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT * FROM messages
        WHERE conversation_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&id)
    .bind(params.sql_limit())
    .bind(params.sql_offset())
    .fetch_all(pool)
    .await?;
    messages.reverse();
    let has_more = params.skip().saturating_add(messages.len()) < count(total);

    let marked = mark_thread_read(pool, &id, viewer).await?;
    if marked > 0 {
        debug!("Marked {marked} messages read in {id}");
    }

    Ok(ConversationPage {
        conversation_id: id,
        messages,
        has_more,
    })
}

/// One summary per accepted connection that has at least one message,
/// ordered by last message, newest first.
pub async fn conversations(pool: &PgPool, viewer: Uuid) -> Result<Vec<ConversationSummary>, AppError> {
    let last_messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT DISTINCT ON (m.conversation_id) m.*
        FROM messages m
        JOIN connections c
            ON c.status = 'accepted'
           AND ((c.requester = m.sender AND c.recipient = m.recipient)
             OR (c.requester = m.recipient AND c.recipient = m.sender))
        WHERE m.sender = $1 OR m.recipient = $1
        ORDER BY m.conversation_id, m.created_at DESC, m.id DESC
        "#,
    )
    .bind(viewer)
    .fetch_all(pool)
    .await?;

    let unread: HashMap<String, i64> = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT conversation_id, COUNT(*) FROM messages
        WHERE recipient = $1 AND NOT is_read
        GROUP BY conversation_id
        "#,
    )
    .bind(viewer)
    .fetch_all(pool)
    .await?
    .into_iter()
    .collect();

    let others: Vec<Uuid> = last_messages
        .iter()
        .map(|m| if m.sender == viewer { m.recipient } else { m.sender })
        .collect();
    let profiles = users_by_ids(pool, &others).await?;

    let mut summaries: Vec<ConversationSummary> = last_messages
        .into_iter()
        .zip(others)
        .map(|(last, other)| ConversationSummary {
            other_user: profiles.get(&other).map(User::public_profile),
            unread_count: unread.get(&last.conversation_id).copied().map(count).unwrap_or(0),
            conversation_id: last.conversation_id.clone(),
            last_message: last,
        })
        .collect();
    summaries.sort_by(|a, b| {
        b.last_message
            .created_at
            .cmp(&a.last_message.created_at)
            .then_with(|| b.last_message.id.cmp(&a.last_message.id))
    });
    Ok(summaries)
}

/// Marks the viewer's unread messages in a thread as read. The viewer must be
/// one of the two users the conversation id names.
pub async fn mark_read(pool: &PgPool, viewer: Uuid, conversation_id: &str) -> Result<usize, AppError> {
    let viewer_key = viewer.to_string();
    match participants(conversation_id) {
        Some((a, b)) if a == viewer_key || b == viewer_key => {}
        Some(_) => return Err(AppError::forbidden("Not a participant in this conversation")),
        None => return Err(AppError::validation("Malformed conversation id")),
    }

    let marked = mark_thread_read(pool, conversation_id, viewer).await?;
    debug!("Marked {marked} messages read in {conversation_id}");
    Ok(marked)
}

pub async fn unread_count(pool: &PgPool, viewer: Uuid) -> Result<usize, AppError> {
    let unread: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE recipient = $1 AND NOT is_read")
            .bind(viewer)
            .fetch_one(pool)
            .await?;
    Ok(count(unread))
}

pub async fn delete_message(pool: &PgPool, viewer: Uuid, message_id: Uuid) -> Result<(), AppError> {
    let sender: Uuid = sqlx::query_scalar("SELECT sender FROM messages WHERE id = $1")
        .bind(message_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Message"))?;
    if sender != viewer {
        return Err(AppError::forbidden("Only the sender can delete a message"));
    }

    sqlx::query("DELETE FROM messages WHERE id = $1")
        .bind(message_id)
        .execute(pool)
        .await?;
    info!("Message {message_id} deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};

    use crate::networking::connections::seed_connection;
    use crate::users::profiles::seed_user;

    struct Fixture {
        alice: Uuid,
        bob: Uuid,
        carol: Uuid,
    }

    async fn fixture(pool: &PgPool) -> Fixture {
        let alice = seed_user(pool, "alice@x.io", "Alice", &[]).await.id;
        let bob = seed_user(pool, "bob@x.io", "Bob", &[]).await.id;
        let carol = seed_user(pool, "carol@x.io", "Carol", &[]).await.id;
        seed_connection(pool, alice, bob).await;
        Fixture { alice, bob, carol }
    }

    fn text(to: Uuid, content: &str) -> NewMessage {
        NewMessage {
            recipient_id: to,
            content: content.to_string(),
            message_type: MessageType::Text,
            attachment: None,
        }
    }

    async fn insert_at(pool: &PgPool, from: Uuid, to: Uuid, content: &str, at: DateTime<Utc>) -> Message {
        let message = Message {
            id: Uuid::new_v4(),
            sender: from,
            recipient: to,
            content: content.to_string(),
            message_type: MessageType::Text,
            attachment: None,
            is_read: false,
            read_at: None,
            conversation_id: conversation_id(from, to),
            created_at: at,
        };
        insert_message(pool, &message).await.unwrap();
        message
    }

    #[tokio::test]
    async fn test_send_validation_precedes_database() {
        let pool = crate::db::unreachable_pool();
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(matches!(
            send_message(&pool, me, text(other, "   ")).await.unwrap_err(),
            AppError::Validation(_)
        ));
        let long = "x".repeat(MESSAGE_MAX_LEN + 1);
        assert!(matches!(
            send_message(&pool, me, text(other, &long)).await.unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            send_message(&pool, me, text(me, "me")).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_mark_read_checks_participants_first() {
        let pool = crate::db::unreachable_pool();
        let id = conversation_id(Uuid::new_v4(), Uuid::new_v4());
        assert!(matches!(
            mark_read(&pool, Uuid::new_v4(), &id).await.unwrap_err(),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            mark_read(&pool, Uuid::new_v4(), "garbage").await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_send_requires_connection(pool: PgPool) {
        let f = fixture(&pool).await;
        let sent = send_message(&pool, f.alice, text(f.bob, "  hello ")).await.unwrap();
        assert_eq!(sent.content, "hello");
        assert_eq!(sent.conversation_id, conversation_id(f.bob, f.alice));

        let err = send_message(&pool, f.alice, text(f.carol, "hi")).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let exact = "x".repeat(MESSAGE_MAX_LEN);
        assert!(send_message(&pool, f.alice, text(f.bob, &exact)).await.is_ok());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_attachment_survives_storage(pool: PgPool) {
        let f = fixture(&pool).await;
        let mut req = text(f.bob, "see file");
        req.message_type = MessageType::File;
        req.attachment = Some(Attachment {
            filename: Some("cv.pdf".to_string()),
            file_size: Some(1024),
            ..Default::default()
        });
        send_message(&pool, f.alice, req).await.unwrap();

        let page = conversation(&pool, f.bob, f.alice, PageParams::default()).await.unwrap();
        let attachment = page.messages[0].attachment.as_ref().unwrap();
        assert_eq!(attachment.filename.as_deref(), Some("cv.pdf"));
        assert_eq!(page.messages[0].message_type, MessageType::File);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_conversation_pages_oldest_first_and_marks_read(pool: PgPool) {
        let f = fixture(&pool).await;
        let start = Utc::now();
        for i in 0..3 {
            insert_at(&pool, f.alice, f.bob, &format!("m{i}"), start + Duration::seconds(i)).await;
        }
        assert_eq!(unread_count(&pool, f.bob).await.unwrap(), 3);

        let page = conversation(&pool, f.bob, f.alice, PageParams::new(1, 2)).await.unwrap();
        let contents: Vec<&str> = page.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m1", "m2"]);
        assert!(page.has_more);
        assert_eq!(unread_count(&pool, f.bob).await.unwrap(), 0);

        let older = conversation(&pool, f.bob, f.alice, PageParams::new(2, 2)).await.unwrap();
        assert_eq!(older.messages.len(), 1);
        assert_eq!(older.messages[0].content, "m0");
        assert!(!older.has_more);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_equal_timestamps_page_without_overlap(pool: PgPool) {
        let f = fixture(&pool).await;
        let at = Utc::now();
        let mut ids = Vec::new();
        for i in 0..3 {
            ids.push(insert_at(&pool, f.alice, f.bob, &format!("m{i}"), at).await.id);
        }
        ids.sort();

        let newest = conversation(&pool, f.bob, f.alice, PageParams::new(1, 2)).await.unwrap();
        let oldest = conversation(&pool, f.bob, f.alice, PageParams::new(2, 2)).await.unwrap();
        let seen: Vec<Uuid> = oldest
            .messages
            .iter()
            .chain(newest.messages.iter())
            .map(|m| m.id)
            .collect();
        assert_eq!(seen, ids);

        let again = conversation(&pool, f.bob, f.alice, PageParams::new(1, 2)).await.unwrap();
        let again: Vec<Uuid> = again.messages.iter().map(|m| m.id).collect();
        assert_eq!(again, ids[1..].to_vec());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_far_page_reports_no_more(pool: PgPool) {
        let f = fixture(&pool).await;
        send_message(&pool, f.alice, text(f.bob, "hi")).await.unwrap();
        let page = conversation(&pool, f.bob, f.alice, PageParams::new(usize::MAX, 10))
            .await
            .unwrap();
        assert!(page.messages.is_empty());
        assert!(!page.has_more);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_conversation_requires_connection(pool: PgPool) {
        let f = fixture(&pool).await;
        let err = conversation(&pool, f.alice, f.carol, PageParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_conversation_summaries_count_unread_per_thread(pool: PgPool) {
        let f = fixture(&pool).await;
        // carol is connected to alice but they never talk
        seed_connection(&pool, f.carol, f.alice).await;

        let start = Utc::now();
        insert_at(&pool, f.bob, f.alice, "one", start).await;
        insert_at(&pool, f.bob, f.alice, "two", start + Duration::seconds(1)).await;
        insert_at(&pool, f.alice, f.bob, "reply", start + Duration::seconds(2)).await;

        let summaries = conversations(&pool, f.alice).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].unread_count, 2);
        assert_eq!(summaries[0].last_message.content, "reply");
        assert_eq!(summaries[0].other_user.as_ref().map(|u| u.id), Some(f.bob));

        let bob_view = conversations(&pool, f.bob).await.unwrap();
        assert_eq!(bob_view[0].unread_count, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_mark_read_only_affects_recipient(pool: PgPool) {
        let f = fixture(&pool).await;
        let m = send_message(&pool, f.alice, text(f.bob, "hi")).await.unwrap();
        assert_eq!(mark_read(&pool, f.alice, &m.conversation_id).await.unwrap(), 0);
        assert_eq!(mark_read(&pool, f.bob, &m.conversation_id).await.unwrap(), 1);
        assert_eq!(mark_read(&pool, f.bob, &m.conversation_id).await.unwrap(), 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_delete_sender_only(pool: PgPool) {
        let f = fixture(&pool).await;
        let m = send_message(&pool, f.alice, text(f.bob, "oops")).await.unwrap();
        assert!(matches!(
            delete_message(&pool, f.bob, m.id).await.unwrap_err(),
            AppError::Forbidden(_)
        ));
        delete_message(&pool, f.alice, m.id).await.unwrap();
        assert_eq!(unread_count(&pool, f.bob).await.unwrap(), 0);
    }
}
