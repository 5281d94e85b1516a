// Session manager for high-level session operations

use super::code::{CodeGenerator, RandomCodeGenerator};
use super::error::SessionError;
use super::storage::SessionStorage;
use super::types::{ChatMessage, FileMeta, MissingSessionPolicy, Session, SessionConfig};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Session manager: short code allocation plus store pass-through
pub struct SessionManager {
    storage: Arc<dyn SessionStorage>,
    generator: Arc<dyn CodeGenerator>,
    config: SessionConfig,
}

impl SessionManager {
    /// Create a new session manager using random codes from the configured alphabet
    pub fn new(storage: Arc<dyn SessionStorage>, config: SessionConfig) -> Self {
        let generator = Arc::new(RandomCodeGenerator::new(config.alphabet));
        Self::with_generator(storage, generator, config)
    }

    pub fn with_generator(
        storage: Arc<dyn SessionStorage>,
        generator: Arc<dyn CodeGenerator>,
        config: SessionConfig,
    ) -> Self {
        Self {
            storage,
            generator,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    /// Create a new, empty session under a fresh short code
    pub async fn create_session(&self) -> Result<Session, SessionError> {
        let attempts = self.config.max_allocation_attempts;

        for attempt in 1..=attempts {
            let candidate = self.generator.generate(self.config.code_length);

            if self.storage.exists(&candidate).await? {
                debug!("Session code {} taken (attempt {})", candidate, attempt);
                continue;
            }

            let session = Session::new(candidate);
            match self.storage.create_session(session.clone()).await {
                Ok(()) => {
                    info!("Created session {}", session.id);
                    return Ok(session);
                }
                // Lost a race with a concurrent create
                Err(SessionError::AlreadyExists(id)) => {
                    debug!("Session code {} claimed concurrently (attempt {})", id, attempt);
                }
                Err(e) => return Err(e),
            }
        }

        warn!("Session code allocation exhausted after {} attempts", attempts);
        Err(SessionError::AllocationExhausted { attempts })
    }

    /// Get a session by its short code
    pub async fn get_session(&self, id: &str) -> Result<Session, SessionError> {
        let id = self.normalize(id)?;

        if let Some(session) = self.storage.get_session(&id).await? {
            return Ok(session);
        }

        match self.config.missing_session_policy {
            MissingSessionPolicy::Reject => Err(SessionError::NotFound(id)),
            MissingSessionPolicy::AutoCreate => {
                self.auto_create(&id).await?;
                self.storage
                    .get_session(&id)
                    .await?
                    .ok_or(SessionError::NotFound(id))
            }
        }
    }

    pub async fn update_content(&self, id: &str, content: String) -> Result<(), SessionError> {
        let id = self.normalize(id)?;
        self.with_missing_policy(&id, || self.storage.update_content(&id, content.clone()))
            .await
    }

    pub async fn append_file(&self, id: &str, file: FileMeta) -> Result<(), SessionError> {
        let id = self.normalize(id)?;
        self.with_missing_policy(&id, || self.storage.append_file(&id, file.clone()))
            .await
    }

    /// Remove the file at `index`; the returned metadata names the stored file.
    /// A missing session is `NotFound` under every policy, since a fresh
    /// session has no file to remove.
    pub async fn remove_file_at(&self, id: &str, index: usize) -> Result<FileMeta, SessionError> {
        let id = self.normalize(id)?;
        self.storage.remove_file_at(&id, index).await
    }

    pub async fn replace_chat_messages(
        &self,
        id: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<(), SessionError> {
        let id = self.normalize(id)?;
        self.with_missing_policy(&id, || {
            self.storage.replace_chat_messages(&id, messages.clone())
        })
        .await
    }

    /// Cleanup expired sessions (should be run periodically)
    pub async fn cleanup_expired_sessions(&self) -> Result<usize, SessionError> {
        let count = self.storage.cleanup_expired_sessions().await?;
        if count > 0 {
            info!("Expired {} sessions", count);
        }
        Ok(count)
    }

    /// Canonical form of a client-supplied id. Ids that the configured
    /// alphabet could never produce cannot exist, so they are reported as
    /// not found without touching the store.
    fn normalize(&self, id: &str) -> Result<String, SessionError> {
        let normalized = self.config.alphabet.normalize(id);
        if self.config.alphabet.accepts(&normalized, self.config.code_length) {
            Ok(normalized)
        } else {
            Err(SessionError::NotFound(id.to_string()))
        }
    }

    async fn auto_create(&self, id: &str) -> Result<(), SessionError> {
        match self.storage.create_session(Session::new(id)).await {
            Ok(()) => {
                info!("Auto-created session {}", id);
                Ok(())
            }
            // Someone else created it first; either way it exists now
            Err(SessionError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Run a mutation; under `AutoCreate`, a missing session is created and
    /// the mutation retried once
    async fn with_missing_policy<T, Fut, F>(&self, id: &str, op: F) -> Result<T, SessionError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, SessionError>>,
    {
        match op().await {
            Err(SessionError::NotFound(_))
                if self.config.missing_session_policy == MissingSessionPolicy::AutoCreate =>
            {
                self.auto_create(id).await?;
                op().await
            }
            result => result,
        }
    }
}

/// Periodically purge expired sessions until the task is aborted
pub fn spawn_expiry_sweeper(manager: Arc<SessionManager>) -> JoinHandle<()> {
    let interval_secs = manager.config().cleanup_interval_secs.max(1);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            if let Err(e) = manager.cleanup_expired_sessions().await {
                error!("Expiry sweep failed: {}", e);
            }
        }
    })
}
