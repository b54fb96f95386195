use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::payment::PaymentLog;
use crate::payments::ledger::{
    payment_by_hash, payments_for_user, record_payment, update_payment_status, NewPayment,
    StatusUpdate,
};
use crate::state::AppState;

/// POST /api/v1/payments
pub async fn handle_record_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<NewPayment>,
) -> Result<(StatusCode, Json<PaymentLog>), AppError> {
    let log = record_payment(&state.db, user.id, req).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

/// GET /api/v1/payments
pub async fn handle_list_payments(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<PaymentLog>>, AppError> {
    Ok(Json(payments_for_user(&state.db, user.id).await?))
}

/// GET /api/v1/payments/:tx_hash
pub async fn handle_get_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tx_hash): Path<String>,
) -> Result<Json<PaymentLog>, AppError> {
    Ok(Json(payment_by_hash(&state.db, user.id, &tx_hash).await?))
}

/// PUT /api/v1/payments/:tx_hash/status
pub async fn handle_update_payment_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tx_hash): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<PaymentLog>, AppError> {
    Ok(Json(
        update_payment_status(&state.db, user.id, &tx_hash, update).await?,
    ))
}
