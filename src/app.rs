// Application state and router assembly

use crate::ai::{GeminiClient, TextModel};
use crate::handlers;
use crate::models::{AppConfig, StorageConfig};
use crate::session::{MemorySessionStorage, RedisSessionStorage, SessionManager, SessionStorage};
use crate::uploads::UploadStore;
use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub uploads: UploadStore,
    pub ai: Option<Arc<dyn TextModel>>,
}

impl AppState {
    pub fn new(
        sessions: Arc<SessionManager>,
        uploads: UploadStore,
        ai: Option<Arc<dyn TextModel>>,
    ) -> Self {
        Self {
            sessions,
            uploads,
            ai,
        }
    }

    /// Build state from configuration, connecting to the configured backends
    pub async fn from_config(config: &AppConfig) -> Result<Self, String> {
        let storage = create_session_storage(config).await?;
        let sessions = Arc::new(SessionManager::new(storage, config.session.clone()));

        let uploads = UploadStore::from_config(&config.uploads);
        uploads
            .init()
            .await
            .map_err(|e| format!("Failed to prepare upload directory: {}", e))?;

        let ai = GeminiClient::from_config(&config.ai)
            .map_err(|e| format!("Failed to configure AI client: {}", e))?
            .map(|client| Arc::new(client) as Arc<dyn TextModel>);
        if ai.is_none() {
            warn!("No AI API key configured; /api/ai/ask is disabled");
        }

        Ok(Self::new(sessions, uploads, ai))
    }
}

/// Factory function to create the session storage backend based on configuration
pub async fn create_session_storage(
    config: &AppConfig,
) -> Result<Arc<dyn SessionStorage>, String> {
    let limits = config.session.limits();
    let ttl = config.session.ttl();

    match &config.storage {
        StorageConfig::Memory => {
            info!("Using in-memory session storage");
            Ok(Arc::new(MemorySessionStorage::new(limits, ttl)))
        }
        StorageConfig::Redis { url, key_prefix } => {
            info!("Using Redis session storage");
            let storage = RedisSessionStorage::new(url, key_prefix, limits, ttl)
                .await
                .map_err(|e| format!("Failed to connect to Redis: {}", e))?;
            Ok(Arc::new(storage))
        }
    }
}

/// Build the HTTP router
pub fn build_router(state: AppState, body_limit: usize) -> Router {
    let uploads = ServeDir::new(state.uploads.dir());
    let public_path = state.uploads.public_path().to_string();

    let api = Router::new()
        .route("/sessions/new", post(handlers::sessions::create_session))
        .route("/sessions/s/:id", get(handlers::sessions::get_session))
        .route("/sessions/:id", get(handlers::sessions::get_session))
        .route("/sessions/:id/content", post(handlers::sessions::save_content))
        .route(
            "/sessions/:id/chat-messages",
            post(handlers::sessions::save_chat_messages),
        )
        .route("/sessions/:id/files", post(handlers::files::upload_file))
        .route(
            "/sessions/:id/files/:index",
            delete(handlers::files::delete_file),
        )
        .route("/ai/ask", post(handlers::ai::ask));

    Router::new()
        // Health check routes
        .route("/", get(handlers::health::health_check))
        .route("/health", get(handlers::health::health_check))
        .nest("/api", api)
        .nest_service(&public_path, uploads)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
