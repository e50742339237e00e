//! Health check endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use slotpool::SlotTable;

use crate::state::AppState;

const SERVICE_NAME: &str = "assignment-finder";

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// "ok" or "degraded".
    pub status: String,
    pub service: String,
    pub version: String,
    /// RFC 3339.
    pub timestamp: String,

    /// Why the assignment table is unreachable, when it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_error: Option<String>,
}

impl HealthResponse {
    fn new(status: &str, table_error: Option<String>) -> Self {
        Self {
            status: status.to_string(),
            service: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now().to_rfc3339(),
            table_error,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/livez", get(livez))
}

/// Process is up; dependencies are not checked.
async fn healthz() -> impl IntoResponse {
    Json(HealthResponse::new("ok", None))
}

/// Ready when the assignment table answers; 503 otherwise.
async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    match state.finder().table().ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::new("ok", None))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse::new("degraded", Some(e.to_string()))),
        ),
    }
}

async fn livez() -> impl IntoResponse {
    StatusCode::OK
}
