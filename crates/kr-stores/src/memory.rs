//! In-memory store providers for testing
//!
//! Both providers count `get` calls so tests can assert that a malformed
//! event triggers zero lookups, and both can be switched into a failure
//! mode to exercise the unavailable-store paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::{ConfigStore, SecretStore, StoreError};

/// In-memory configuration store
#[derive(Default)]
pub struct InMemoryConfigStore {
    values: RwLock<HashMap<String, String>>,
    fail_with: RwLock<Option<StoreError>>,
    get_calls: AtomicU64,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().unwrap().insert(key.into(), value.into());
    }

    /// Make every subsequent `get` fail with the given error.
    pub fn fail_with(&self, error: StoreError) {
        *self.fail_with.write().unwrap() = Some(error);
    }

    pub fn clear_failure(&self) {
        *self.fail_with.write().unwrap() = None;
    }

    /// Number of `get` calls issued against this store.
    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.fail_with.read().unwrap().clone() {
            return Err(error);
        }

        self.values
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn name(&self) -> &str {
        "in-memory-config"
    }
}

/// In-memory secret store
#[derive(Default)]
pub struct InMemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
    fail_with: RwLock<Option<StoreError>>,
    get_calls: AtomicU64,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, secret_id: impl Into<String>, value: impl Into<String>) {
        self.secrets.write().unwrap().insert(secret_id.into(), value.into());
    }

    /// Make every subsequent `get` fail with the given error.
    pub fn fail_with(&self, error: StoreError) {
        *self.fail_with.write().unwrap() = Some(error);
    }

    pub fn clear_failure(&self) {
        *self.fail_with.write().unwrap() = None;
    }

    /// Number of `get` calls issued against this store.
    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get(&self, secret_id: &str) -> Result<String, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.fail_with.read().unwrap().clone() {
            return Err(error);
        }

        self.secrets
            .read()
            .unwrap()
            .get(secret_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(secret_id.to_string()))
    }

    fn name(&self) -> &str {
        "in-memory-secret"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_config_store_get_and_not_found() {
        let store = InMemoryConfigStore::new();
        store.insert("/identity/alice/email", "alice@example.com");

        let value = store.get("/identity/alice/email").await.unwrap();
        assert_eq!(value, "alice@example.com");

        let err = store.get("/identity/bob/email").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.get_calls(), 2);
    }

    #[tokio::test]
    async fn test_secret_store_fault_injection() {
        let store = InMemorySecretStore::new();
        store.insert("identity-onetime-credential", "Tmp#Pass123!");
        store.fail_with(StoreError::Unavailable("throttled".to_string()));

        let err = store.get("identity-onetime-credential").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        store.clear_failure();
        let value = store.get("identity-onetime-credential").await.unwrap();
        assert_eq!(value, "Tmp#Pass123!");
    }
}
