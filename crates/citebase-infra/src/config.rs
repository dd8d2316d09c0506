//! Configuration loader for Citebase.
//!
//! Reads `config.toml` from the data directory (`~/.citebase/` in production)
//! and deserializes it into [`CitebaseConfig`]. Falls back to defaults when
//! the file is missing, malformed, or describes an unusable budget.

use std::path::{Path, PathBuf};

use citebase_types::config::CitebaseConfig;

pub const CONFIG_FILE_NAME: &str = "config.toml";

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE_NAME)
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`CitebaseConfig::default()`].
/// - If the file cannot be read or parsed, logs a warning and returns the default.
/// - If the file parses but fails [`CitebaseConfig::validate`], logs a warning
///   and returns the default.
pub async fn load_config(data_dir: &Path) -> CitebaseConfig {
    let config_path = config_path(data_dir);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return CitebaseConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return CitebaseConfig::default();
        }
    };

    let config = match toml::from_str::<CitebaseConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            return CitebaseConfig::default();
        }
    };

    match config.validate() {
        Ok(()) => {
            tracing::debug!(
                path = %config_path.display(),
                default_model = %config.default_model,
                max_requests = config.rate_limit.max_requests,
                "Loaded configuration"
            );
            config
        }
        Err(err) => {
            tracing::warn!("{}: {err}, using defaults", config_path.display());
            CitebaseConfig::default()
        }
    }
}
