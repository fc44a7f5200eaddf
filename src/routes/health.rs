use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::models::HealthResponse;

pub fn router() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
}

async fn index() -> Json<Value> {
    Json(json!({ "message": "Biomarkers API Server" }))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
