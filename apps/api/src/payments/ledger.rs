use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{is_unique_violation, AppError};
use crate::models::payment::{normalize_tx_hash, PaymentLog, PaymentPurpose, PaymentStatus};

const DEFAULT_CURRENCY: &str = "ETH";
const DEFAULT_NETWORK: &str = "ethereum";

#[derive(Debug, Deserialize)]
pub struct NewPayment {
    pub job: Option<Uuid>,
    pub amount: f64,
    pub currency: Option<String>,
    pub transaction_hash: String,
    #[serde(default)]
    pub from_address: String,
    #[serde(default)]
    pub to_address: String,
    pub network: Option<String>,
    #[serde(default)]
    pub purpose: PaymentPurpose,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: PaymentStatus,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub gas_price: Option<String>,
}

impl StatusUpdate {
    /// Moves `log` to the new status. Chain details are kept only on
    /// confirmation; out-of-range numbers are rejected before anything changes.
    pub fn apply(self, log: &mut PaymentLog) -> Result<(), AppError> {
        let block_number = chain_number("block_number", self.block_number)?;
        let gas_used = chain_number("gas_used", self.gas_used)?;

        log.status = self.status;
        match self.status {
            PaymentStatus::Confirmed => {
                log.block_number = block_number.or(log.block_number);
                log.gas_used = gas_used.or(log.gas_used);
                log.gas_price = self.gas_price.or(log.gas_price.take());
            }
            PaymentStatus::Failed => warn!("Payment {} marked failed", log.transaction_hash),
            PaymentStatus::Pending => {}
        }
        log.updated_at = Utc::now();
        Ok(())
    }
}

fn chain_number(field: &str, value: Option<u64>) -> Result<Option<i64>, AppError> {
    value
        .map(i64::try_from)
        .transpose()
        .map_err(|_| AppError::validation(format!("{field} is out of range")))
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub async fn record_payment(pool: &PgPool, user: Uuid, req: NewPayment) -> Result<PaymentLog, AppError> {
    let hash = normalize_tx_hash(&req.transaction_hash);
    if hash.is_empty() {
        return Err(AppError::validation("Transaction hash is required"));
    }
    if req.amount.is_nan() || req.amount <= 0.0 {
        return Err(AppError::validation("Amount must be greater than zero"));
    }

    if let Some(job) = req.job {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM jobs WHERE id = $1)")
            .bind(job)
            .fetch_one(pool)
            .await?;
        if !exists {
            return Err(AppError::not_found("Job"));
        }
    }

    let now = Utc::now();
    let log = PaymentLog {
        id: Uuid::new_v4(),
        user,
        job: req.job,
        amount: req.amount,
        currency: or_default(req.currency, DEFAULT_CURRENCY),
        transaction_hash: hash,
        from_address: req.from_address.trim().to_string(),
        to_address: req.to_address.trim().to_string(),
        status: PaymentStatus::Pending,
        block_number: None,
        gas_used: None,
        gas_price: None,
        network: or_default(req.network, DEFAULT_NETWORK),
        purpose: req.purpose,
        created_at: now,
        updated_at: now,
    };

    let inserted = sqlx::query(
        r#"
        INSERT INTO payment_logs
            (id, user_id, job_id, amount, currency, transaction_hash, from_address, to_address,
             status, block_number, gas_used, gas_price, network, purpose, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        "#,
    )
    .bind(log.id)
    .bind(log.user)
    .bind(log.job)
    .bind(log.amount)
    .bind(&log.currency)
    .bind(&log.transaction_hash)
    .bind(&log.from_address)
    .bind(&log.to_address)
    .bind(log.status)
    .bind(log.block_number)
    .bind(log.gas_used)
    .bind(&log.gas_price)
    .bind(&log.network)
    .bind(log.purpose)
    .bind(log.created_at)
    .bind(log.updated_at)
    .execute(pool)
    .await;

    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict(format!(
                "Payment with transaction hash {} already recorded",
                log.transaction_hash
            )))
        }
        Err(e) => return Err(e.into()),
    }

    info!("Recorded payment {} for user {user}", log.transaction_hash);
    Ok(log)
}

/// Owner-only status transition.
pub async fn update_payment_status(
    pool: &PgPool,
    owner: Uuid,
    transaction_hash: &str,
    update: StatusUpdate,
) -> Result<PaymentLog, AppError> {
    let hash = normalize_tx_hash(transaction_hash);
    let mut tx = pool.begin().await?;
    let mut log = sqlx::query_as::<_, PaymentLog>(
        "SELECT * FROM payment_logs WHERE transaction_hash = $1 FOR UPDATE",
    )
    .bind(&hash)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Payment"))?;
    if log.user != owner {
        return Err(AppError::forbidden("Not authorized to update this payment"));
    }

    update.apply(&mut log)?;

    sqlx::query(
        r#"
        UPDATE payment_logs
        SET status = $2, block_number = $3, gas_used = $4, gas_price = $5, updated_at = $6
        WHERE id = $1
        "#,
    )
    .bind(log.id)
    .bind(log.status)
    .bind(log.block_number)
    .bind(log.gas_used)
    .bind(&log.gas_price)
    .bind(log.updated_at)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("Payment {hash} is now {:?}", log.status);
    Ok(log)
}

/// The user's payments, newest first.
pub async fn payments_for_user(pool: &PgPool, user: Uuid) -> Result<Vec<PaymentLog>, AppError> {
    Ok(sqlx::query_as::<_, PaymentLog>(
        "SELECT * FROM payment_logs WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(user)
    .fetch_all(pool)
    .await?)
}

/// Owner-only lookup by transaction hash.
pub async fn payment_by_hash(
    pool: &PgPool,
    viewer: Uuid,
    transaction_hash: &str,
) -> Result<PaymentLog, AppError> {
    let log = sqlx::query_as::<_, PaymentLog>(
        "SELECT * FROM payment_logs WHERE transaction_hash = $1",
    )
    .bind(normalize_tx_hash(transaction_hash))
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Payment"))?;
    if log.user != viewer {
        return Err(AppError::forbidden("Not authorized to view this payment"));
    }
    Ok(log)
}
