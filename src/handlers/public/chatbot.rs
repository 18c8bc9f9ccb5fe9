// handlers/public/chatbot.rs - POST /chatbot

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::api::JsonBody;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::chatbot::ChatMessage;
use crate::services::ServiceError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

/// POST /chatbot - Support assistant backed by a hosted LLM
pub async fn post(State(state): State<AppState>, JsonBody(payload): JsonBody<ChatRequest>) -> ApiResult<ChatReply> {
    let reply = state
        .chat
        .reply(&payload.message, &payload.history)
        .await
        .map_err(ServiceError::from)?;
    Ok(ApiResponse::success(ChatReply { reply }))
}
