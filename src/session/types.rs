// Session types and data structures

use super::code::Alphabet;
use super::error::SessionError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Longest accepted retention window (ten years)
pub const MAX_TTL_SECS: i64 = 10 * 365 * 86400;

/// What the manager does when a well-formed id is not in the store
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingSessionPolicy {
    /// Report the session as not found
    #[default]
    Reject,
    /// Create an empty session under the requested id
    AutoCreate,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Length of generated session codes
    pub code_length: usize,
    /// Character set for generated session codes
    pub alphabet: Alphabet,
    /// Retention window measured from creation
    pub ttl_secs: i64,
    /// Maximum content size in bytes
    pub max_content_bytes: usize,
    /// Maximum number of attached files
    pub max_files: usize,
    /// Maximum number of stored chat messages
    pub max_chat_messages: usize,
    /// Candidates tried before giving up on allocation
    pub max_allocation_attempts: usize,
    pub missing_session_policy: MissingSessionPolicy,
    /// Interval of the background expiry sweep
    pub cleanup_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            alphabet: Alphabet::HumanFriendly,
            ttl_secs: 86400, // 24 hours
            max_content_bytes: 10_000_000,
            max_files: 50,
            max_chat_messages: 100,
            max_allocation_attempts: 16,
            missing_session_policy: MissingSessionPolicy::Reject,
            cleanup_interval_secs: 300,
        }
    }
}

impl SessionConfig {
    pub fn limits(&self) -> SessionLimits {
        SessionLimits {
            max_content_bytes: self.max_content_bytes,
            max_files: self.max_files,
            max_chat_messages: self.max_chat_messages,
        }
    }

    /// Retention window; out-of-range values saturate instead of panicking
    pub fn ttl(&self) -> Duration {
        Duration::try_seconds(self.ttl_secs).unwrap_or(Duration::MAX)
    }
}

/// Size caps enforced by storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_content_bytes: usize,
    pub max_files: usize,
    pub max_chat_messages: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        SessionConfig::default().limits()
    }
}

/// Metadata of an uploaded file; the bytes live with the upload store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    /// Original file name as uploaded
    pub name: String,
    /// Name of the file on disk
    pub stored_name: String,
    /// Media type reported by the client
    #[serde(rename = "type")]
    pub media_type: String,
    /// Size in bytes
    pub size: u64,
    /// Relative URL the file is served from
    pub url: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    #[serde(alias = "ai")]
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    #[serde(alias = "type")]
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Shared clipboard session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Short code identifying the session
    pub id: String,
    pub content: String,
    pub files: Vec<FileMeta>,
    pub chat_messages: Vec<ChatMessage>,
    /// Creation time; drives expiry
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session
    pub fn new(id: impl Into<String>) -> Self {
        Self::new_at(id, Utc::now())
    }

    pub fn new_at(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            content: String::new(),
            files: Vec::new(),
            chat_messages: Vec::new(),
            created_at,
        }
    }

    /// Expiry instant; a window past the end of time never expires
    pub fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.created_at
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now >= self.expires_at(ttl)
    }

    // The mutators below check every cap before touching the record, so an
    // error always leaves the session unchanged.

    pub fn set_content(&mut self, text: String, limits: &SessionLimits) -> Result<(), SessionError> {
        if text.len() > limits.max_content_bytes {
            return Err(SessionError::TooLarge {
                size: text.len(),
                max: limits.max_content_bytes,
            });
        }
        self.content = text;
        Ok(())
    }

    pub fn push_file(&mut self, file: FileMeta, limits: &SessionLimits) -> Result<(), SessionError> {
        if self.files.len() >= limits.max_files {
            return Err(SessionError::TooManyFiles {
                max: limits.max_files,
            });
        }
        self.files.push(file);
        Ok(())
    }

    pub fn remove_file_at(&mut self, index: usize) -> Result<FileMeta, SessionError> {
        if index >= self.files.len() {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.files.len(),
            });
        }
        Ok(self.files.remove(index))
    }

    pub fn replace_chat_messages(
        &mut self,
        messages: Vec<ChatMessage>,
        limits: &SessionLimits,
    ) -> Result<(), SessionError> {
        if messages.len() > limits.max_chat_messages {
            return Err(SessionError::TooManyMessages {
                count: messages.len(),
                max: limits.max_chat_messages,
            });
        }
        self.chat_messages = messages;
        Ok(())
    }
}

/// Session as returned to API clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: String,
    pub content: String,
    pub files: Vec<FileMeta>,
    pub chat_messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionView {
    pub fn new(session: Session, ttl: Duration) -> Self {
        let expires_at = session.expires_at(ttl);
        Self {
            id: session.id,
            content: session.content,
            files: session.files,
            chat_messages: session.chat_messages,
            created_at: session.created_at,
            expires_at,
        }
    }
}
