use super::{ApiError, ai_error, bad_request, json_rejection};
use crate::ai::AiError;
use crate::app::AppState;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub prompt: String,
    /// Shared text the prompt refers to
    #[serde(default)]
    pub content: String,
}

/// POST /api/ai/ask
pub async fn ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload.map_err(json_rejection)?;
    let model = state
        .ai
        .as_ref()
        .ok_or_else(|| ai_error(AiError::NotConfigured))?;

    if payload.prompt.trim().is_empty() {
        return Err(bad_request("Prompt must not be empty"));
    }

    let reply = model
        .ask(&payload.prompt, &payload.content)
        .await
        .map_err(ai_error)?;

    Ok(Json(json!({ "reply": reply })))
}
