use crate::models::{AppConfig, StorageConfig, app_config::default_key_prefix};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, String> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    // Read the file
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

    parse_config(&contents)
}

/// Parse and validate YAML configuration
pub fn parse_config(contents: &str) -> Result<AppConfig, String> {
    // An empty document means "all defaults"
    let config: AppConfig = if contents.trim().is_empty() {
        AppConfig::default()
    } else {
        serde_yaml::from_str(contents).map_err(|e| format!("Failed to parse YAML config: {}", e))?
    };

    config.validate()?;
    Ok(config)
}

/// Apply environment variable overrides on top of file configuration
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        config.server.port = port
            .parse()
            .map_err(|e| format!("Invalid PORT '{}': {}", port, e))?;
    }

    if let Some(url) = lookup("REDIS_URL") {
        let key_prefix = match &config.storage {
            StorageConfig::Redis { key_prefix, .. } => key_prefix.clone(),
            StorageConfig::Memory => default_key_prefix(),
        };
        config.storage = StorageConfig::Redis { url, key_prefix };
    }

    if let Some(key) = lookup("GEMINI_API_KEY").filter(|k| !k.is_empty()) {
        config.ai.api_key = Some(key);
    }

    if let Some(dir) = lookup("UPLOAD_DIR") {
        config.uploads.dir = dir;
    }

    config.validate()
}

/// Load configuration with fallback options
pub fn load_config_with_fallback() -> Result<Arc<AppConfig>, String> {
    let mut config = load_file_config()?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

    info!(
        "Configuration: port {}, {:?} codes of length {}, ttl {}s, storage {}",
        config.server.port,
        config.session.alphabet,
        config.session.code_length,
        config.session.ttl_secs,
        match config.storage {
            StorageConfig::Memory => "memory",
            StorageConfig::Redis { .. } => "redis",
        }
    );

    Ok(Arc::new(config))
}

fn load_file_config() -> Result<AppConfig, String> {
    // An explicit path must load
    if let Ok(config_path) = std::env::var("CONFIG_PATH") {
        return load_config(&config_path)
            .map_err(|e| format!("Failed to load config from CONFIG_PATH ({}): {}", config_path, e));
    }

    // Try common config file locations
    let paths = ["config.yaml", "config.yml"];

    for path in paths {
        if Path::new(path).exists() {
            match load_config(path) {
                Ok(config) => return Ok(config),
                Err(e) => warn!("Failed to load config from '{}': {}", path, e),
            }
        }
    }

    info!("No configuration file found, using defaults");
    Ok(AppConfig::default())
}
