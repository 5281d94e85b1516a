pub mod app_config;

pub use app_config::{AiConfig, AppConfig, ServerConfig, StorageConfig, UploadConfig};
