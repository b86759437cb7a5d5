//! Notification Handler
//!
//! Single-shot, stateless request/response unit: one audit event in, one
//! structured `NotificationResult` out. All collaborators are injected at
//! construction time; the handler owns no persistent resources and performs
//! no writes, so concurrent and duplicate invocations are safe.
//!
//! The handler never returns an error: every failure is converted into a
//! `Failure` result locally so the dispatcher's delivery layer cannot end up
//! retrying or dead-lettering on a fault the pipeline already classified.

use std::sync::Arc;

use tracing::{debug, error};

use kr_common::{AuditEvent, NotificationErrorKind, NotificationResult};
use kr_stores::{ConfigStore, SecretStore, StoreError};

use crate::event::{parse_event, ParsedEvent};
use crate::sink::NotificationSink;

/// Handler configuration: key shape and secret identity
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Prefix of the contact-address key in the configuration store
    pub contact_key_prefix: String,
    /// Suffix of the contact-address key in the configuration store
    pub contact_key_suffix: String,
    /// Stable identifier of the shared one-time credential
    pub shared_secret_id: String,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            contact_key_prefix: "/identity/".to_string(),
            contact_key_suffix: "/email".to_string(),
            shared_secret_id: "identity-onetime-credential".to_string(),
        }
    }
}

impl HandlerConfig {
    /// The configuration-store key for an identity's contact address,
    /// e.g. `/identity/alice/email`.
    pub fn contact_key(&self, identity: &str) -> String {
        format!("{}{}{}", self.contact_key_prefix, identity, self.contact_key_suffix)
    }
}

/// The notification handler
pub struct NotificationHandler {
    contact_store: Arc<dyn ConfigStore>,
    secret_store: Arc<dyn SecretStore>,
    sink: Arc<dyn NotificationSink>,
    config: HandlerConfig,
}

impl NotificationHandler {
    pub fn new(
        contact_store: Arc<dyn ConfigStore>,
        secret_store: Arc<dyn SecretStore>,
        sink: Arc<dyn NotificationSink>,
        config: HandlerConfig,
    ) -> Self {
        Self {
            contact_store,
            secret_store,
            sink,
            config,
        }
    }

    /// Process one identity-creation event.
    ///
    /// Malformed events are dropped with a `Skipped` result and zero store
    /// calls. For valid events both lookups are issued concurrently; both
    /// must succeed before a success result is recorded.
    pub async fn handle(&self, event: &AuditEvent) -> NotificationResult {
        match parse_event(event) {
            ParsedEvent::Malformed { reason } => {
                // An error condition, but not a pipeline failure: the event
                // is dropped without touching either store.
                error!(reason = %reason, "Dropping malformed identity-creation event");
                NotificationResult::skipped(reason)
            }
            ParsedEvent::Valid { identity_name } => self.notify(&identity_name).await,
        }
    }

    async fn notify(&self, identity: &str) -> NotificationResult {
        let contact_key = self.config.contact_key(identity);
        debug!(
            identity = %identity,
            contact_key = %contact_key,
            secret_id = %self.config.shared_secret_id,
            "Resolving contact address and shared credential"
        );

        // Fan-out/join: the lookups are independent, both must succeed
        let (contact, credential) = tokio::join!(
            self.contact_store.get(&contact_key),
            self.secret_store.get(&self.config.shared_secret_id),
        );

        let result = match (contact, credential) {
            (Ok(contact_address), Ok(credential)) => {
                NotificationResult::success(identity, contact_address, credential)
            }
            // When both lookups fail the contact-store error wins; either
            // ordering is acceptable, partial success never is.
            (Err(e), _) | (_, Err(e)) => {
                let (kind, detail) = classify_store_error(e);
                NotificationResult::failure(Some(identity.to_string()), kind, detail)
            }
        };

        self.sink.record(&result).await;
        result
    }
}

fn classify_store_error(error: StoreError) -> (NotificationErrorKind, String) {
    match error {
        StoreError::NotFound(key) => (
            NotificationErrorKind::LookupNotFound,
            format!("required record does not exist: {}", key),
        ),
        StoreError::Unavailable(detail) => (NotificationErrorKind::StoreUnavailable, detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::InMemorySink;
    use kr_common::{AuditEventDetail, NotificationStatus, RequestParameters};
    use kr_stores::{InMemoryConfigStore, InMemorySecretStore};

    fn creation_event(user_name: &str) -> AuditEvent {
        AuditEvent {
            source: Some("identity-provisioning-audit".to_string()),
            detail_type: Some("api-call-via-trail".to_string()),
            detail: Some(AuditEventDetail {
                event_source: Some("iam-service".to_string()),
                event_name: Some("CreateUser".to_string()),
                request_parameters: Some(RequestParameters {
                    user_name: Some(user_name.to_string()),
                }),
            }),
        }
    }

    struct Fixture {
        contact_store: Arc<InMemoryConfigStore>,
        secret_store: Arc<InMemorySecretStore>,
        sink: Arc<InMemorySink>,
        handler: NotificationHandler,
    }

    fn fixture() -> Fixture {
        let contact_store = Arc::new(InMemoryConfigStore::new());
        let secret_store = Arc::new(InMemorySecretStore::new());
        let sink = Arc::new(InMemorySink::new());
        let handler = NotificationHandler::new(
            contact_store.clone(),
            secret_store.clone(),
            sink.clone(),
            HandlerConfig::default(),
        );
        Fixture {
            contact_store,
            secret_store,
            sink,
            handler,
        }
    }

    #[tokio::test]
    async fn test_success_returns_store_values_verbatim() {
        let f = fixture();
        f.contact_store
            .insert("/identity/s3-user/email", "s3user@example.com");
        f.secret_store
            .insert("identity-onetime-credential", "Tmp#Pass123!");

        let result = f.handler.handle(&creation_event("s3-user")).await;

        assert!(result.is_success());
        assert_eq!(result.identity.as_deref(), Some("s3-user"));
        assert_eq!(result.contact_address.as_deref(), Some("s3user@example.com"));
        assert_eq!(result.credential.as_deref(), Some("Tmp#Pass123!"));
        assert_eq!(f.sink.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_event_skips_without_lookups() {
        let f = fixture();

        for event in [
            AuditEvent::default(),
            creation_event(""),
            {
                let mut e = creation_event("x");
                e.detail.as_mut().unwrap().request_parameters = None;
                e
            },
        ] {
            let result = f.handler.handle(&event).await;
            assert!(result.is_skipped());
        }

        assert_eq!(f.contact_store.get_calls(), 0);
        assert_eq!(f.secret_store.get_calls(), 0);
        // Skipped events are dropped inputs, not notifications
        assert!(f.sink.is_empty());
    }

    #[tokio::test]
    async fn test_missing_contact_record_fails_without_partial_success() {
        let f = fixture();
        f.secret_store
            .insert("identity-onetime-credential", "Tmp#Pass123!");

        let result = f.handler.handle(&creation_event("alice")).await;

        assert_eq!(result.status, NotificationStatus::Failure);
        assert_eq!(result.error_kind, Some(NotificationErrorKind::LookupNotFound));
        assert!(result
            .error_detail
            .as_deref()
            .unwrap()
            .contains("/identity/alice/email"));
        assert!(result.contact_address.is_none());
        assert!(result.credential.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_secret_store_fails_without_panicking() {
        let f = fixture();
        f.contact_store
            .insert("/identity/alice/email", "alice@example.com");
        f.secret_store
            .fail_with(StoreError::Unavailable("throttled".to_string()));

        let result = f.handler.handle(&creation_event("alice")).await;

        assert_eq!(result.status, NotificationStatus::Failure);
        assert_eq!(
            result.error_kind,
            Some(NotificationErrorKind::StoreUnavailable)
        );
        assert_eq!(f.sink.len(), 1);
    }

    #[tokio::test]
    async fn test_both_lookups_failing_reports_contact_error() {
        let f = fixture();
        // Neither record exists
        let result = f.handler.handle(&creation_event("alice")).await;

        assert_eq!(result.error_kind, Some(NotificationErrorKind::LookupNotFound));
        assert!(result
            .error_detail
            .as_deref()
            .unwrap()
            .contains("/identity/alice/email"));
    }

    #[tokio::test]
    async fn test_handle_is_idempotent() {
        let f = fixture();
        f.contact_store
            .insert("/identity/alice/email", "alice@example.com");
        f.secret_store
            .insert("identity-onetime-credential", "Tmp#Pass123!");

        let event = creation_event("alice");
        let first = f.handler.handle(&event).await;
        let second = f.handler.handle(&event).await;

        assert_eq!(first.status, second.status);
        assert_eq!(first.identity, second.identity);
        assert_eq!(first.contact_address, second.contact_address);
        assert_eq!(first.credential, second.credential);
        assert_eq!(first.error_kind, second.error_kind);
    }
}
