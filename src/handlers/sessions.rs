use super::{ApiError, json_rejection, path_rejection, session_error};
use crate::app::AppState;
use crate::session::{ChatMessage, SessionView};
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessagesRequest {
    pub messages: Vec<ChatMessage>,
}

/// POST /api/sessions/new
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let session = state.sessions.create_session().await.map_err(session_error)?;
    Ok((StatusCode::CREATED, Json(json!({ "id": session.id }))))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<SessionView>, ApiError> {
    let Path(id) = id.map_err(path_rejection)?;
    let session = state.sessions.get_session(&id).await.map_err(session_error)?;
    Ok(Json(SessionView::new(
        session,
        state.sessions.config().ttl(),
    )))
}

/// POST /api/sessions/:id/content
pub async fn save_content(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<ContentRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id.map_err(path_rejection)?;
    let Json(payload) = payload.map_err(json_rejection)?;
    debug!("Saving {} bytes of content to session {}", payload.content.len(), id);

    state
        .sessions
        .update_content(&id, payload.content)
        .await
        .map_err(session_error)?;

    Ok(Json(json!({ "success": true })))
}

/// POST /api/sessions/:id/chat-messages
pub async fn save_chat_messages(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<ChatMessagesRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id.map_err(path_rejection)?;
    let Json(payload) = payload.map_err(json_rejection)?;
    debug!("Saving {} chat messages to session {}", payload.messages.len(), id);

    state
        .sessions
        .replace_chat_messages(&id, payload.messages)
        .await
        .map_err(session_error)?;

    Ok(Json(json!({ "success": true })))
}
