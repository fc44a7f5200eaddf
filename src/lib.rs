// Biomarker Assistant - clinical biomarker API with a tool-calling AI assistant

pub mod agents;
pub mod config;
pub mod dataset;
pub mod llm;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod tools;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use config::Config;
pub use dataset::Dataset;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
