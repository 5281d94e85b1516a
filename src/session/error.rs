// Session error kinds

use thiserror::Error;

/// Errors raised by session storage backends and the session manager.
///
/// Every rejected mutation leaves the stored record exactly as it was, so
/// callers can surface these directly without re-reading the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Id collision during create. The manager retries on this, so it should
    /// not reach HTTP callers.
    #[error("Session already exists: {0}")]
    AlreadyExists(String),

    /// Unknown or expired session.
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Content too large: {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: usize, max: usize },

    #[error("Too many files: a session holds at most {max} files")]
    TooManyFiles { max: usize },

    #[error("Chat history too large: {count} messages exceeds the {max} message limit")]
    TooManyMessages { count: usize, max: usize },

    #[error("File index {index} out of range (session has {len} files)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Could not allocate a free session code after {attempts} attempts")]
    AllocationExhausted { attempts: usize },

    /// Backend failure (connection, serialization).
    #[error("Storage error: {0}")]
    Storage(String),
}

impl SessionError {
    /// Stable snake_case identifier for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::AlreadyExists(_) => "already_exists",
            SessionError::NotFound(_) => "session_not_found",
            SessionError::TooLarge { .. } => "content_too_large",
            SessionError::TooManyFiles { .. } => "too_many_files",
            SessionError::TooManyMessages { .. } => "too_many_messages",
            SessionError::IndexOutOfRange { .. } => "file_index_out_of_range",
            SessionError::AllocationExhausted { .. } => "allocation_exhausted",
            SessionError::Storage(_) => "storage_error",
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::Storage(format!("Serialization error: {}", e))
    }
}

impl From<redis::RedisError> for SessionError {
    fn from(e: redis::RedisError) -> Self {
        SessionError::Storage(format!("Redis error: {}", e))
    }
}
