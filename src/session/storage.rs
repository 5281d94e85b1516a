// Session storage backends

use super::error::SessionError;
use super::types::{ChatMessage, FileMeta, Session, SessionLimits};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Trait for session storage backends
///
/// Records older than the backend's retention window are unreachable through
/// every operation. Mutations either apply completely or not at all.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Whether a live session exists under `id`
    async fn exists(&self, id: &str) -> Result<bool, SessionError>;

    /// Store a new session; fails with `AlreadyExists` if the id is live
    async fn create_session(&self, session: Session) -> Result<(), SessionError>;

    /// Get a session by ID; `None` for unknown or expired ids
    async fn get_session(&self, id: &str) -> Result<Option<Session>, SessionError>;

    /// Replace the text content
    async fn update_content(&self, id: &str, content: String) -> Result<(), SessionError>;

    /// Append file metadata
    async fn append_file(&self, id: &str, file: FileMeta) -> Result<(), SessionError>;

    /// Remove the file at `index`, returning its metadata
    async fn remove_file_at(&self, id: &str, index: usize) -> Result<FileMeta, SessionError>;

    /// Replace the whole chat transcript
    async fn replace_chat_messages(
        &self,
        id: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<(), SessionError>;

    /// Purge expired sessions, returning how many were removed
    async fn cleanup_expired_sessions(&self) -> Result<usize, SessionError>;

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<(), SessionError>;

    /// Backend name for health reporting
    fn backend_name(&self) -> &'static str;
}

/// In-memory session storage implementation
///
/// All mutations run under one write lock, which serializes read-modify-write
/// sequences on the same id.
pub struct MemorySessionStorage {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    limits: SessionLimits,
    ttl: Duration,
}

impl MemorySessionStorage {
    pub fn new(limits: SessionLimits, ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            limits,
            ttl,
        }
    }

    /// Apply `f` to the live session under `id` while holding the write lock
    async fn modify<T, F>(&self, id: &str, f: F) -> Result<T, SessionError>
    where
        F: FnOnce(&mut Session, &SessionLimits) -> Result<T, SessionError> + Send,
        T: Send,
    {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();

        let expired = match sessions.get(id) {
            Some(session) => session.is_expired(self.ttl, now),
            None => return Err(SessionError::NotFound(id.to_string())),
        };

        if expired {
            sessions.remove(id);
            debug!("Session {} expired before update", id);
            return Err(SessionError::NotFound(id.to_string()));
        }

        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        f(session, &self.limits)
    }
}

impl Default for MemorySessionStorage {
    fn default() -> Self {
        Self::new(SessionLimits::default(), Duration::hours(24))
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn exists(&self, id: &str) -> Result<bool, SessionError> {
        let sessions = self.sessions.read().await;
        let now = Utc::now();
        Ok(sessions
            .get(id)
            .is_some_and(|s| !s.is_expired(self.ttl, now)))
    }

    async fn create_session(&self, session: Session) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();

        if let Some(existing) = sessions.get(&session.id)
            && !existing.is_expired(self.ttl, now)
        {
            return Err(SessionError::AlreadyExists(session.id));
        }

        info!("Creating session {}", session.id);
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, SessionError> {
        let sessions = self.sessions.read().await;
        let now = Utc::now();
        Ok(sessions
            .get(id)
            .filter(|s| !s.is_expired(self.ttl, now))
            .cloned())
    }

    async fn update_content(&self, id: &str, content: String) -> Result<(), SessionError> {
        self.modify(id, move |session, limits| session.set_content(content, limits))
            .await
    }

    async fn append_file(&self, id: &str, file: FileMeta) -> Result<(), SessionError> {
        self.modify(id, move |session, limits| session.push_file(file, limits))
            .await
    }

    async fn remove_file_at(&self, id: &str, index: usize) -> Result<FileMeta, SessionError> {
        self.modify(id, move |session, _| session.remove_file_at(index))
            .await
    }

    async fn replace_chat_messages(
        &self,
        id: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<(), SessionError> {
        self.modify(id, move |session, limits| {
            session.replace_chat_messages(messages, limits)
        })
        .await
    }

    async fn cleanup_expired_sessions(&self) -> Result<usize, SessionError> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();

        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(self.ttl, now));
        let count = before - sessions.len();

        if count > 0 {
            debug!("Cleaned up {} expired sessions", count);
        }

        Ok(count)
    }

    async fn ping(&self) -> Result<(), SessionError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
