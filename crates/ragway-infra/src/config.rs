//! Configuration loader for ragway.
//!
//! Reads `config.toml` from the data directory (`~/.ragway/` in production)
//! and deserializes it into [`AppConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::{Path, PathBuf};

use ragway_types::config::AppConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "RAGWAY_DATA_DIR";

/// Environment variable supplying the upstream key when `config.toml` has none.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Resolve the data directory.
///
/// Priority:
/// 1. `RAGWAY_DATA_DIR` environment variable
/// 2. `~/.ragway`
/// 3. `.ragway` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".ragway");
    }

    PathBuf::from(".ragway")
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`AppConfig::default()`].
/// - Unreadable or unparsable file: logs a warning and returns the default.
///
/// Generation and embedding keys left unset fall back to `OPENAI_API_KEY`.
pub async fn load_config(data_dir: &Path) -> AppConfig {
    let mut config = read_config_file(data_dir).await;
    apply_env_key(&mut config, std::env::var(OPENAI_API_KEY_ENV).ok());
    config
}

async fn read_config_file(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

fn apply_env_key(config: &mut AppConfig, env_key: Option<String>) {
    let Some(key) = env_key.filter(|k| !k.is_empty()) else {
        return;
    };
    if config.generation.api_key.is_none() {
        config.generation.api_key = Some(key.clone());
    }
    if config.embedding.api_key.is_none() {
        config.embedding.api_key = Some(key);
    }
}
