// Session management module
// Short code allocation, session storage backends, and expiry

pub mod code;
pub mod error;
pub mod manager;
pub mod redis_storage;
pub mod storage;
pub mod types;

pub use code::{Alphabet, CodeGenerator, RandomCodeGenerator, SeededCodeGenerator};
pub use error::SessionError;
pub use manager::{SessionManager, spawn_expiry_sweeper};
pub use redis_storage::RedisSessionStorage;
pub use storage::{MemorySessionStorage, SessionStorage};
pub use types::{
    ChatMessage, ChatRole, FileMeta, MAX_TTL_SECS, MissingSessionPolicy, Session, SessionConfig,
    SessionLimits, SessionView,
};
