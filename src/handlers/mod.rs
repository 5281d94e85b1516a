// HTTP handlers and error mapping

pub mod ai;
pub mod files;
pub mod health;
pub mod sessions;

use crate::ai::AiError;
use crate::session::SessionError;
use crate::uploads::UploadError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::{Json, http::StatusCode};
use serde_json::{Value, json};
use tracing::error;

/// Error response: status plus `{"error": message, "code": kind}`
pub type ApiError = (StatusCode, Json<Value>);

fn error_response(status: StatusCode, code: &str, message: String) -> ApiError {
    if status.is_server_error() {
        error!("{} ({}): {}", status, code, message);
    }
    (status, Json(json!({ "error": message, "code": code })))
}

pub fn session_error(e: SessionError) -> ApiError {
    let status = match &e {
        SessionError::NotFound(_) | SessionError::IndexOutOfRange { .. } => StatusCode::NOT_FOUND,
        SessionError::TooLarge { .. }
        | SessionError::TooManyFiles { .. }
        | SessionError::TooManyMessages { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        SessionError::AllocationExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::AlreadyExists(_) | SessionError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, e.code(), e.to_string())
}

pub fn upload_error(e: UploadError) -> ApiError {
    let (status, code) = match &e {
        UploadError::MissingFile => (StatusCode::BAD_REQUEST, "missing_file"),
        UploadError::Invalid(_) => (StatusCode::BAD_REQUEST, "invalid_upload"),
        UploadError::TooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "file_too_large"),
        UploadError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "upload_failed"),
    };
    error_response(status, code, e.to_string())
}

pub fn ai_error(e: AiError) -> ApiError {
    let (status, code) = match &e {
        AiError::NotConfigured => (StatusCode::SERVICE_UNAVAILABLE, "ai_not_configured"),
        AiError::Request(_) => (StatusCode::BAD_GATEWAY, "ai_request_failed"),
        AiError::Api(_) => (StatusCode::BAD_GATEWAY, "ai_api_error"),
        AiError::EmptyResponse => (StatusCode::BAD_GATEWAY, "ai_empty_response"),
    };
    error_response(status, code, e.to_string())
}

/// Malformed JSON body or missing fields
pub fn json_rejection(e: JsonRejection) -> ApiError {
    error_response(e.status(), "invalid_request", e.body_text())
}

/// Path segment that does not parse, such as a non-numeric file index
pub fn path_rejection(e: PathRejection) -> ApiError {
    error_response(e.status(), "invalid_request", e.body_text())
}

pub fn multipart_rejection(e: MultipartRejection) -> ApiError {
    error_response(e.status(), "invalid_request", e.body_text())
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, "bad_request", message.into())
}
