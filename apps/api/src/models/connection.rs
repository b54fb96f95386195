use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const CONNECTION_MESSAGE_MAX_LEN: usize = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "connection_status", rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Connection {
    pub id: Uuid,
    pub requester: Uuid,
    pub recipient: Uuid,
    pub status: ConnectionStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(requester: Uuid, recipient: Uuid, message: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            requester,
            recipient,
            status: ConnectionStatus::Pending,
            message: message.map(|m| m.trim().to_string()).unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.requester == user_id || self.recipient == user_id
    }

    /// Whichever side of the connection is not `viewer`.
    pub fn other_user(&self, viewer: Uuid) -> Uuid {
        if self.requester == viewer {
            self.recipient
        } else {
            self.requester
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ConnectionStatus::Accepted
    }
}
