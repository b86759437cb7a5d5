//! AWS Systems Manager Parameter Store client
//!
//! Backs the configuration store holding per-identity contact addresses.
//! Keys are used as-is (e.g. `/identity/alice/email`), no prefix is applied.
//! Configuration via standard AWS SDK chain (env vars, instance profile, etc.)

use async_trait::async_trait;
use aws_sdk_ssm::Client;
use tracing::{debug, info};

use crate::{ConfigStore, StoreError};

/// Parameter Store configuration client
pub struct ParameterStoreClient {
    client: Client,
}

impl ParameterStoreClient {
    /// Create a new Parameter Store client
    ///
    /// # Arguments
    /// * `region` - Optional AWS region (uses default if not specified)
    pub async fn new(region: Option<String>) -> Self {
        let config = if let Some(region) = region {
            aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(region))
                .load()
                .await
        } else {
            aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await
        };

        let client = Client::new(&config);
        info!("Initialized AWS Parameter Store client");

        Self { client }
    }

    /// Create from an existing SSM client (shared SDK config)
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConfigStore for ParameterStoreClient {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        debug!(parameter_name = %key, "Retrieving parameter from AWS Parameter Store");

        let response = self.client
            .get_parameter()
            .name(key)
            .with_decryption(true)  // Automatically decrypt SecureString parameters
            .send()
            .await
            .map_err(|e| {
                let err_msg = e.to_string();
                if err_msg.contains("ParameterNotFound") {
                    StoreError::NotFound(key.to_string())
                } else {
                    StoreError::Unavailable(format!(
                        "Failed to retrieve parameter from AWS Parameter Store: {}",
                        err_msg
                    ))
                }
            })?;

        response.parameter()
            .and_then(|p| p.value())
            .map(|v| v.to_string())
            .ok_or_else(|| StoreError::Unavailable(
                "Parameter has no value".to_string()
            ))
    }

    fn name(&self) -> &str {
        "aws-parameter-store"
    }
}
