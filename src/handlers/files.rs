use super::{ApiError, multipart_rejection, path_rejection, session_error, upload_error};
use crate::app::AppState;
use crate::session::FileMeta;
use crate::uploads::UploadError;
use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::PathRejection;
use axum::extract::{Multipart, Path, State};
use serde_json::{Value, json};
use tracing::info;

/// POST /api/sessions/:id/files (multipart, field `file`)
pub async fn upload_file(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<FileMeta>, ApiError> {
    let Path(id) = id.map_err(path_rejection)?;
    let mut multipart = multipart.map_err(multipart_rejection)?;

    // Fail before writing anything for sessions that do not exist
    let session = state.sessions.get_session(&id).await.map_err(session_error)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(UploadError::Invalid(e.body_text())))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let name = field.file_name().unwrap_or("file").to_string();
        let media_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| upload_error(UploadError::Invalid(e.body_text())))?;

        let meta = state
            .uploads
            .save(&name, &media_type, &bytes)
            .await
            .map_err(upload_error)?;

        if let Err(e) = state.sessions.append_file(&session.id, meta.clone()).await {
            // The session never references the bytes, so drop them
            state.uploads.remove(&meta.stored_name).await;
            return Err(session_error(e));
        }

        info!("Attached {} to session {}", meta.stored_name, session.id);
        return Ok(Json(meta));
    }

    Err(upload_error(UploadError::MissingFile))
}

/// DELETE /api/sessions/:id/files/:index
pub async fn delete_file(
    State(state): State<AppState>,
    path: Result<Path<(String, usize)>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path((id, index)) = path.map_err(path_rejection)?;
    let removed = state
        .sessions
        .remove_file_at(&id, index)
        .await
        .map_err(session_error)?;

    state.uploads.remove(&removed.stored_name).await;
    info!("Removed {} from session {}", removed.stored_name, id);

    Ok(Json(json!({ "success": true })))
}
