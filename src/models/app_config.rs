use crate::session::{MAX_TTL_SECS, SessionConfig};
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
    pub ai: AiConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
        }
    }
}

/// Session storage backend selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Process-local storage, lost on restart
    #[default]
    Memory,
    /// Redis with native key expiry
    Redis {
        url: String,
        #[serde(default = "default_key_prefix")]
        key_prefix: String,
    },
}

pub fn default_key_prefix() -> String {
    "clipshare:session:".to_string()
}

/// Upload handling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory uploaded files are written to
    pub dir: String,
    /// URL prefix the directory is served under
    pub public_path: String,
    /// Largest accepted upload in bytes
    pub max_file_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: "uploads".to_string(),
            public_path: "/uploads".to_string(),
            max_file_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Generative text API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// API key; the AI endpoint is disabled without one
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-flash-latest".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 60,
        }
    }
}

impl AppConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let session = &self.session;

        if session.code_length == 0 {
            return Err("session.code_length must be at least 1".to_string());
        }

        // A code space this small would exhaust allocation almost immediately
        if session.alphabet.code_space(session.code_length) < 1000 {
            return Err(format!(
                "session.code_length {} is too short for the {:?} alphabet",
                session.code_length, session.alphabet
            ));
        }

        if session.ttl_secs <= 0 {
            return Err("session.ttl_secs must be positive".to_string());
        }

        if session.ttl_secs > MAX_TTL_SECS {
            return Err(format!(
                "session.ttl_secs {} exceeds the maximum of {}",
                session.ttl_secs, MAX_TTL_SECS
            ));
        }

        if session.max_allocation_attempts == 0 {
            return Err("session.max_allocation_attempts must be at least 1".to_string());
        }

        if session.max_content_bytes == 0 || session.max_files == 0 || session.max_chat_messages == 0
        {
            return Err("session size limits must be non-zero".to_string());
        }

        if let StorageConfig::Redis { url, .. } = &self.storage
            && url.is_empty()
        {
            return Err("storage.url must be set for the redis backend".to_string());
        }

        if self.uploads.dir.is_empty() {
            return Err("uploads.dir must be set".to_string());
        }

        let public_path = self.uploads.public_path.trim_end_matches('/');
        if !self.uploads.public_path.starts_with('/') || public_path.is_empty() {
            return Err(format!(
                "uploads.public_path '{}' must start with '/' and name a sub-path",
                self.uploads.public_path
            ));
        }

        Ok(())
    }

    /// Request body limit covering both content saves and uploads
    pub fn body_limit(&self) -> usize {
        // Headroom for JSON escaping and multipart framing
        self.session.max_content_bytes.max(self.uploads.max_file_bytes) * 2 + 64 * 1024
    }
}
