use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "payment_purpose", rename_all = "kebab-case")]
pub enum PaymentPurpose {
    #[default]
    JobPosting,
    PremiumFeature,
    Subscription,
}

/// On-chain payment record. The job's own payment fields remain authoritative
/// for posting; this log is bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentLog {
    pub id: Uuid,
    #[sqlx(rename = "user_id")]
    pub user: Uuid,
    #[sqlx(rename = "job_id")]
    pub job: Option<Uuid>,
    pub amount: f64,
    pub currency: String,
    pub transaction_hash: String,
    pub from_address: String,
    pub to_address: String,
    pub status: PaymentStatus,
    pub block_number: Option<i64>,
    pub gas_used: Option<i64>,
    pub gas_price: Option<String>,
    pub network: String,
    pub purpose: PaymentPurpose,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Transaction hashes are compared case-insensitively.
pub fn normalize_tx_hash(hash: &str) -> String {
    hash.trim().to_lowercase()
}
