//! Health endpoint

use axum::{response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

/// Liveness probe; not subject to the simulation pipeline.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now()
    }))
}
