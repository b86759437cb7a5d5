//! AWS Secrets Manager client
//!
//! Backs the secret store holding the shared one-time credential. The
//! credential is generated once by the provisioning collaborator and is
//! read-only from the pipeline's perspective.
//! Configuration via standard AWS SDK chain (env vars, instance profile, etc.)

use async_trait::async_trait;
use aws_sdk_secretsmanager::Client;
use tracing::{debug, info};

use crate::{SecretStore, StoreError};

/// Secrets Manager secret client
pub struct SecretsManagerClient {
    client: Client,
}

impl SecretsManagerClient {
    /// Create a new Secrets Manager client
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
        info!("Initialized AWS Secrets Manager client");

        Self { client }
    }

    /// Create from an existing Secrets Manager client (shared SDK config)
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for SecretsManagerClient {
    async fn get(&self, secret_id: &str) -> Result<String, StoreError> {
        debug!(secret_name = %secret_id, "Retrieving secret from AWS Secrets Manager");

        let response = self.client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| {
                let err_msg = e.to_string();
                if err_msg.contains("ResourceNotFoundException") {
                    StoreError::NotFound(secret_id.to_string())
                } else {
                    StoreError::Unavailable(format!(
                        "Failed to retrieve secret from AWS Secrets Manager: {}",
                        err_msg
                    ))
                }
            })?;

        response.secret_string()
            .map(|s| s.to_string())
            .ok_or_else(|| StoreError::Unavailable(
                "Secret is stored as binary, but string expected".to_string()
            ))
    }

    fn name(&self) -> &str {
        "aws-secrets-manager"
    }
}
