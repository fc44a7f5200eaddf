use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::agents::ChatAgent;
use crate::models::{AppState, ChatMessage, ChatResponse};
use crate::types::{AppError, AppResult, LLMMessage};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(post_chat))
        .with_state(state)
}

pub async fn post_chat(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<ChatResponse>> {
    let Json(body) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let messages = parse_messages(&body)?;

    info!(messages = messages.len(), "Received chat request");

    let agent = ChatAgent::new(state.llm.clone(), state.dataset.clone(), &state.config.llm);
    let outcome = agent.run(messages).await?;

    Ok(Json(ChatResponse {
        response: outcome.response,
    }))
}

fn parse_messages(body: &Value) -> AppResult<Vec<LLMMessage>> {
    let items = body
        .get("messages")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::InvalidRequest("Messages array is required".to_string()))?;

    items
        .iter()
        .map(|item| {
            ChatMessage::deserialize(item)
                .map(LLMMessage::from)
                .map_err(|e| AppError::InvalidRequest(format!("Invalid message: {}", e)))
        })
        .collect()
}
