//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "keyrelay.toml",
    "./config/config.toml",
    "./config/keyrelay.toml",
    "/etc/keyrelay/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        // Start with defaults
        let mut config = AppConfig::default();

        // Try to load from file
        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        // Apply environment variable overrides
        self.apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        // Check explicit path first
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        // Check KEYRELAY_CONFIG env var
        if let Ok(path) = env::var("KEYRELAY_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // Check standard paths
        for path in CONFIG_PATHS {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&self, config: &mut AppConfig) {
        // HTTP
        if let Ok(val) = env::var("KR_HTTP_PORT") {
            if let Ok(port) = val.parse() {
                config.http.port = port;
            }
        }
        if let Ok(val) = env::var("KR_HTTP_HOST") {
            config.http.host = val;
        }

        // AWS
        if let Ok(val) = env::var("KR_AWS_REGION") {
            config.aws.region = val;
        }

        // Queue
        if let Ok(val) = env::var("KR_QUEUE_URL") {
            config.queue.queue_url = val;
        }
        if let Ok(val) = env::var("KR_QUEUE_VISIBILITY_TIMEOUT") {
            if let Ok(timeout) = val.parse() {
                config.queue.visibility_timeout_seconds = timeout;
            }
        }
        if let Ok(val) = env::var("KR_QUEUE_WAIT_TIME") {
            if let Ok(wait) = val.parse() {
                config.queue.wait_time_seconds = wait;
            }
        }
        if let Ok(val) = env::var("KR_QUEUE_MAX_MESSAGES") {
            if let Ok(max) = val.parse() {
                config.queue.max_messages_per_poll = max;
            }
        }

        // Stores
        if let Ok(val) = env::var("KR_CONTACT_KEY_PREFIX") {
            config.stores.contact_key_prefix = val;
        }
        if let Ok(val) = env::var("KR_CONTACT_KEY_SUFFIX") {
            config.stores.contact_key_suffix = val;
        }
        if let Ok(val) = env::var("KR_SHARED_SECRET_ID") {
            config.stores.shared_secret_id = val;
        }

        // Pipeline
        if let Ok(val) = env::var("KR_HANDLER_TIMEOUT_SECONDS") {
            if let Ok(timeout) = val.parse() {
                config.pipeline.handler_timeout_seconds = timeout;
            }
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[stores]\nshared_secret_id = \"bootstrap-credential\"\n"
        )
        .unwrap();

        let loader = ConfigLoader::with_path(file.path());
        let config = loader.load().unwrap();
        assert_eq!(config.stores.shared_secret_id, "bootstrap-credential");
        // Untouched sections keep defaults
        assert_eq!(config.pipeline.handler_timeout_seconds, 30);
    }

    #[test]
    fn test_missing_explicit_path_falls_back_to_defaults() {
        let loader = ConfigLoader::with_path("/nonexistent/keyrelay.toml");
        let config = loader.load().unwrap();
        assert_eq!(config.stores.contact_key_prefix, "/identity/");
    }
}
