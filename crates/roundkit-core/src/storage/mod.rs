mod config;

pub use config::{builtin_games, Config, FeedbackConfig, StatsApiConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/roundkit[-dev]/` based on ROUNDKIT_ENV.
///
/// Set ROUNDKIT_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("ROUNDKIT_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("roundkit-dev")
    } else {
        base_dir.join("roundkit")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::LoadFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
