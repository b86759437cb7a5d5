//! KeyRelay Configuration System
//!
//! This crate provides TOML-based configuration with environment variable override support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Environment variable error: {0}")]
    EnvError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub aws: AwsConfig,
    pub queue: QueueConfig,
    pub stores: StoresConfig,
    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            aws: AwsConfig::default(),
            queue: QueueConfig::default(),
            stores: StoresConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

/// HTTP server configuration (health/status endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 9090,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// AWS client configuration shared by the store and queue clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Region override; empty string uses the SDK default chain
    pub region: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: String::new(),
        }
    }
}

impl AwsConfig {
    pub fn region(&self) -> Option<String> {
        if self.region.is_empty() {
            None
        } else {
            Some(self.region.clone())
        }
    }
}

/// Event queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// SQS queue URL delivering matched audit events
    pub queue_url: String,
    /// Visibility timeout for in-flight events (seconds)
    pub visibility_timeout_seconds: u32,
    /// Long poll wait time (seconds, SQS max 20)
    pub wait_time_seconds: u32,
    /// Max events fetched per poll (SQS max 10)
    pub max_messages_per_poll: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_url: String::new(),
            visibility_timeout_seconds: 60,
            wait_time_seconds: 5,
            max_messages_per_poll: 10,
        }
    }
}

/// External store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoresConfig {
    /// Prefix of the contact-address key in the configuration store
    pub contact_key_prefix: String,
    /// Suffix of the contact-address key in the configuration store
    pub contact_key_suffix: String,
    /// Stable identifier of the shared one-time credential in the secret store
    pub shared_secret_id: String,
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            contact_key_prefix: "/identity/".to_string(),
            contact_key_suffix: "/email".to_string(),
            shared_secret_id: "identity-onetime-credential".to_string(),
        }
    }
}

impl StoresConfig {
    /// Assemble the configuration-store key for an identity's contact address.
    pub fn contact_key(&self, identity: &str) -> String {
        format!("{}{}{}", self.contact_key_prefix, identity, self.contact_key_suffix)
    }
}

/// Pipeline execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bound on a single handler invocation (seconds)
    pub handler_timeout_seconds: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            handler_timeout_seconds: 30,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        let loader = ConfigLoader::new();
        loader.load()
    }

    /// Validate settings the service cannot run without
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stores.shared_secret_id.is_empty() {
            return Err(ConfigError::ValidationError(
                "stores.shared_secret_id must not be empty".to_string(),
            ));
        }
        if self.pipeline.handler_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.handler_timeout_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# KeyRelay Configuration
# Environment variables override these settings

[http]
port = 9090
host = "0.0.0.0"

[aws]
region = ""  # empty uses the SDK default chain

[queue]
queue_url = ""
visibility_timeout_seconds = 60
wait_time_seconds = 5
max_messages_per_poll = 10

[stores]
contact_key_prefix = "/identity/"
contact_key_suffix = "/email"
shared_secret_id = "identity-onetime-credential"

[pipeline]
handler_timeout_seconds = 30
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.handler_timeout_seconds, 30);
        assert_eq!(config.stores.shared_secret_id, "identity-onetime-credential");
        config.validate().unwrap();
    }

    #[test]
    fn test_contact_key() {
        let stores = StoresConfig::default();
        assert_eq!(stores.contact_key("alice"), "/identity/alice/email");
    }

    #[test]
    fn test_example_toml_parses() {
        let config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        assert_eq!(config.http.port, 9090);
        assert_eq!(config.queue.max_messages_per_poll, 10);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str("[pipeline]\nhandler_timeout_seconds = 5\n").unwrap();
        assert_eq!(config.pipeline.handler_timeout_seconds, 5);
        assert_eq!(config.stores.contact_key_prefix, "/identity/");
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = AppConfig::default();
        config.pipeline.handler_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }
}
