use axum::{extract::State, Json};
use serde::Serialize;
use tracing::warn;

use crate::db::{record_counts, RecordCounts};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    pub remote_matching: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<RecordCounts>,
}

/// GET /health
///
/// Always answers 200; an unreachable database shows up as `degraded`.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let records = match record_counts(&state.db).await {
        Ok(counts) => Some(counts),
        Err(e) => {
            warn!("Health check could not reach the database: {e}");
            None
        }
    };
    Json(HealthResponse {
        status: if records.is_some() { "ok" } else { "degraded" },
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        database: if records.is_some() { "ok" } else { "unreachable" },
        remote_matching: state.matchers.remote_enabled(),
        records,
    })
}
