//! Conversational agent endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::routes::ApiError;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// `POST /agent/chat` - process one user message through the scheduling
/// agent and return its reply.
pub async fn chat(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let reply = ctx.agent.chat(req.user_id, &req.message).await?;
    Ok(Json(ChatResponse { reply }))
}
