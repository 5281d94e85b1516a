use crate::app::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::warn;

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let storage = state.sessions.storage();

    let (status, storage_status) = match storage.ping().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            warn!("Storage health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    let overall = if status == StatusCode::OK {
        "healthy"
    } else {
        "degraded"
    };

    (
        status,
        Json(json!({
            "status": overall,
            "service": "clipshare",
            "version": env!("CARGO_PKG_VERSION"),
            "storage": {
                "backend": storage.backend_name(),
                "status": storage_status,
            },
            "ai": state.ai.is_some(),
        })),
    )
}
