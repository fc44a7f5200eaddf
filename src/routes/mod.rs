//! API Routes
//!
//! This module organizes all HTTP endpoints for the application:
//! - `/api/patients` - Patient and biomarker records, AI insights
//! - `/api/chat` - Tool-calling assistant chat
//! - `/` and `/health` - Liveness

pub mod chat;
pub mod health;
pub mod patients;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::apply_cors;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let origins = state.config.server.cors_allowed_origins.clone();

    let router = Router::new()
        .merge(patients::router(state.clone()))
        .merge(chat::router(state))
        .merge(health::router())
        .layer(TraceLayer::new_for_http());

    apply_cors(router, &origins)
}
