use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

pub const MESSAGE_MAX_LEN: usize = 2000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "message_type", rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    File,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachment {
    pub url: Option<String>,
    pub filename: Option<String>,
    pub file_type: Option<String>,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub sender: Uuid,
    pub recipient: Uuid,
    pub content: String,
    pub message_type: MessageType,
    /// JSONB; serializes as the bare attachment object.
    pub attachment: Option<Json<Attachment>>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub conversation_id: String,
    pub created_at: DateTime<Utc>,
}
