// Redis-backed session storage
// Expiry uses native key TTLs; mutations are optimistic WATCH/MULTI/EXEC transactions

use super::error::SessionError;
use super::storage::SessionStorage;
use super::types::{ChatMessage, FileMeta, Session, SessionLimits};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use redis::{AsyncCommands, aio::MultiplexedConnection};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Transaction attempts before giving up under contention
const MAX_TRANSACTION_ATTEMPTS: usize = 8;

/// Redis session storage, one JSON document per session key
pub struct RedisSessionStorage {
    /// Shared connection; held for the whole of a transaction so WATCH state
    /// is not interleaved with other commands
    conn: Arc<Mutex<MultiplexedConnection>>,
    key_prefix: String,
    limits: SessionLimits,
    ttl: Duration,
}

impl RedisSessionStorage {
    /// Connect to Redis
    pub async fn new(
        redis_url: &str,
        key_prefix: &str,
        limits: SessionLimits,
        ttl: Duration,
    ) -> Result<Self, SessionError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;

        info!("Connected to Redis session storage");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            key_prefix: key_prefix.to_string(),
            limits,
            ttl,
        })
    }

    fn session_key(&self, id: &str) -> String {
        format!("{}{}", self.key_prefix, id)
    }

    async fn unwatch(conn: &mut MultiplexedConnection) {
        let result: Result<(), redis::RedisError> =
            redis::cmd("UNWATCH").query_async(conn).await;
        if let Err(e) = result {
            warn!("Redis UNWATCH failed: {}", e);
        }
    }

    /// Read-modify-write of one session. `f` may run more than once if another
    /// writer commits in between; the stored record is only replaced when the
    /// transaction commits.
    async fn modify<T, F>(&self, id: &str, f: F) -> Result<T, SessionError>
    where
        F: Fn(&mut Session, &SessionLimits) -> Result<T, SessionError> + Send + Sync,
        T: Send,
    {
        let key = self.session_key(id);
        let mut conn = self.conn.lock().await;

        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            redis::cmd("WATCH")
                .arg(&key)
                .query_async::<_, ()>(&mut *conn)
                .await?;

            let raw: Option<String> = conn.get(&key).await?;
            let Some(raw) = raw else {
                Self::unwatch(&mut conn).await;
                return Err(SessionError::NotFound(id.to_string()));
            };

            let mut session: Session = match serde_json::from_str(&raw) {
                Ok(session) => session,
                Err(e) => {
                    Self::unwatch(&mut conn).await;
                    return Err(e.into());
                }
            };

            let outcome = match f(&mut session, &self.limits) {
                Ok(outcome) => outcome,
                Err(e) => {
                    Self::unwatch(&mut conn).await;
                    return Err(e);
                }
            };

            let json = serde_json::to_string(&session)?;

            // None: transaction aborted by a concurrent write (or expiry)
            let committed: Option<(Option<String>,)> = redis::pipe()
                .atomic()
                .cmd("SET")
                .arg(&key)
                .arg(json)
                .arg("XX")
                .arg("KEEPTTL")
                .query_async(&mut *conn)
                .await?;

            match committed {
                Some((Some(_),)) => return Ok(outcome),
                Some((None,)) => return Err(SessionError::NotFound(id.to_string())),
                None => debug!("Session {} changed during update (attempt {})", id, attempt),
            }
        }

        Err(SessionError::Storage(format!(
            "Session {} is under too much contention",
            id
        )))
    }
}

#[async_trait]
impl SessionStorage for RedisSessionStorage {
    async fn exists(&self, id: &str) -> Result<bool, SessionError> {
        let key = self.session_key(id);
        let mut conn = self.conn.lock().await;
        let exists: bool = conn.exists(&key).await?;
        Ok(exists)
    }

    async fn create_session(&self, session: Session) -> Result<(), SessionError> {
        let key = self.session_key(&session.id);
        let remaining_ms = (session.expires_at(self.ttl) - Utc::now()).num_milliseconds();

        if remaining_ms <= 0 {
            // Would be unreachable immediately; nothing to store
            debug!("Session {} created already expired", session.id);
            return Ok(());
        }

        let json = serde_json::to_string(&session)?;
        let mut conn = self.conn.lock().await;

        let created: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(json)
            .arg("NX")
            .arg("PX")
            .arg(remaining_ms)
            .query_async(&mut *conn)
            .await?;

        match created {
            Some(_) => {
                info!("Creating session {}", session.id);
                Ok(())
            }
            None => Err(SessionError::AlreadyExists(session.id)),
        }
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, SessionError> {
        let key = self.session_key(id);
        let mut conn = self.conn.lock().await;
        let raw: Option<String> = conn.get(&key).await?;

        match raw {
            Some(raw) => {
                let session: Session = serde_json::from_str(&raw)?;
                if session.is_expired(self.ttl, Utc::now()) {
                    return Ok(None);
                }
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn update_content(&self, id: &str, content: String) -> Result<(), SessionError> {
        self.modify(id, |session, limits| {
            session.set_content(content.clone(), limits)
        })
        .await
    }

    async fn append_file(&self, id: &str, file: FileMeta) -> Result<(), SessionError> {
        self.modify(id, |session, limits| session.push_file(file.clone(), limits))
            .await
    }

    async fn remove_file_at(&self, id: &str, index: usize) -> Result<FileMeta, SessionError> {
        self.modify(id, |session, _| session.remove_file_at(index))
            .await
    }

    async fn replace_chat_messages(
        &self,
        id: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<(), SessionError> {
        self.modify(id, |session, limits| {
            session.replace_chat_messages(messages.clone(), limits)
        })
        .await
    }

    async fn cleanup_expired_sessions(&self) -> Result<usize, SessionError> {
        // Redis evicts expired keys itself
        Ok(0)
    }

    async fn ping(&self) -> Result<(), SessionError> {
        let mut conn = self.conn.lock().await;
        let _: String = redis::cmd("PING").query_async(&mut *conn).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
