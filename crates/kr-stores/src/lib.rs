//! KeyRelay External Stores
//!
//! Read-only clients for the two external collaborators the notification
//! pipeline depends on:
//! - a key-value configuration store holding per-identity contact addresses
//!   (AWS Systems Manager Parameter Store, feature flag `aws`)
//! - a secret store holding the shared one-time credential
//!   (AWS Secrets Manager, feature flag `aws`)
//!
//! Both collaborators are provisioned and mutated by infrastructure outside
//! this system; the pipeline only ever reads from them. In-memory providers
//! with call counting and fault injection back the test suite.

use async_trait::async_trait;
use thiserror::Error;

mod memory;

pub use memory::{InMemoryConfigStore, InMemorySecretStore};

#[cfg(feature = "aws")]
mod parameter_store;
#[cfg(feature = "aws")]
pub use parameter_store::ParameterStoreClient;

#[cfg(feature = "aws")]
mod secrets_manager;
#[cfg(feature = "aws")]
pub use secrets_manager::SecretsManagerClient;

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// The requested record does not exist. This is a broken consistency
    /// precondition, not a transient fault; the handler does not retry it.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The store could not be reached or refused the request (timeout,
    /// throttling, permission denial). Retry is delegated to the host.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Key-value configuration store holding contact-address records.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetch the value stored under `key`.
    async fn get(&self, key: &str) -> Result<String, StoreError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Secret store holding the shared one-time credential.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the secret value stored under the stable identifier `secret_id`.
    async fn get(&self, secret_id: &str) -> Result<String, StoreError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
