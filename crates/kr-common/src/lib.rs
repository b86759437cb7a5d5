use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod logging;

// ============================================================================
// Audit Event Types
// ============================================================================

/// An audit event as observed on the wire.
///
/// Events arrive from an external audit trail and carry no schema guarantee:
/// every level of nesting is optional and unknown fields are ignored. The
/// pipeline must never fail to deserialize an event — a structurally odd
/// event is simply one that will not match or will parse as malformed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditEvent {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(rename = "detail-type", default)]
    pub detail_type: Option<String>,
    #[serde(default)]
    pub detail: Option<AuditEventDetail>,
}

/// The `detail` envelope of an audit event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEventDetail {
    #[serde(default)]
    pub event_source: Option<String>,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub request_parameters: Option<RequestParameters>,
}

/// Request parameters nested inside the event detail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParameters {
    #[serde(default)]
    pub user_name: Option<String>,
}

impl AuditEvent {
    /// The identity name buried in the event, if present at every level.
    pub fn identity_name(&self) -> Option<&str> {
        self.detail
            .as_ref()?
            .request_parameters
            .as_ref()?
            .user_name
            .as_deref()
    }
}

// ============================================================================
// Notification Result Types
// ============================================================================

/// Outcome status of one handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    /// Both lookups succeeded and a notification was recorded.
    Success,
    /// The event was malformed (missing/empty identity name); dropped, no lookups.
    Skipped,
    /// A lookup or the invocation itself failed.
    Failure,
}

/// Classified failure cause carried on a failed or skipped result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationErrorKind {
    /// Required field missing or empty; the event is dropped, never retried.
    MalformedEvent,
    /// A required external record does not exist (consistency precondition broken).
    LookupNotFound,
    /// Transient failure reaching an external store; host-level retry applies.
    StoreUnavailable,
    /// The invocation exceeded its execution bound.
    Timeout,
    /// Unexpected fault inside the handler, contained at the boundary.
    InternalFault,
}

impl std::fmt::Display for NotificationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationErrorKind::MalformedEvent => write!(f, "MALFORMED_EVENT"),
            NotificationErrorKind::LookupNotFound => write!(f, "LOOKUP_NOT_FOUND"),
            NotificationErrorKind::StoreUnavailable => write!(f, "STORE_UNAVAILABLE"),
            NotificationErrorKind::Timeout => write!(f, "TIMEOUT"),
            NotificationErrorKind::InternalFault => write!(f, "INTERNAL_FAULT"),
        }
    }
}

/// The structured result of one notification attempt.
///
/// Ephemeral — the pipeline does not persist results; the notification sink
/// owns delivery and retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResult {
    pub status: NotificationStatus,
    pub identity: Option<String>,
    pub contact_address: Option<String>,
    /// The shared one-time credential, carried verbatim when resolved.
    pub credential: Option<String>,
    pub error_kind: Option<NotificationErrorKind>,
    pub error_detail: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl NotificationResult {
    pub fn success(
        identity: impl Into<String>,
        contact_address: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            status: NotificationStatus::Success,
            identity: Some(identity.into()),
            contact_address: Some(contact_address.into()),
            credential: Some(credential.into()),
            error_kind: None,
            error_detail: None,
            completed_at: Utc::now(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: NotificationStatus::Skipped,
            identity: None,
            contact_address: None,
            credential: None,
            error_kind: Some(NotificationErrorKind::MalformedEvent),
            error_detail: Some(reason.into()),
            completed_at: Utc::now(),
        }
    }

    pub fn failure(
        identity: Option<String>,
        kind: NotificationErrorKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status: NotificationStatus::Failure,
            identity,
            contact_address: None,
            credential: None,
            error_kind: Some(kind),
            error_detail: Some(detail.into()),
            completed_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == NotificationStatus::Success
    }

    pub fn is_skipped(&self) -> bool {
        self.status == NotificationStatus::Skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_deserializes_with_missing_levels() {
        let event: AuditEvent = serde_json::from_str("{}").unwrap();
        assert!(event.source.is_none());
        assert!(event.identity_name().is_none());

        let event: AuditEvent =
            serde_json::from_str(r#"{"detail": {"eventName": "CreateUser"}}"#).unwrap();
        assert_eq!(
            event.detail.as_ref().unwrap().event_name.as_deref(),
            Some("CreateUser")
        );
        assert!(event.identity_name().is_none());
    }

    #[test]
    fn test_event_ignores_unknown_fields() {
        let raw = r#"{
            "source": "identity-provisioning-audit",
            "detail-type": "api-call-via-trail",
            "region": "eu-west-1",
            "detail": {
                "eventSource": "iam-service",
                "eventName": "CreateUser",
                "requestParameters": {"userName": "alice", "path": "/"}
            }
        }"#;
        let event: AuditEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.identity_name(), Some("alice"));
        assert_eq!(event.source.as_deref(), Some("identity-provisioning-audit"));
        assert_eq!(event.detail_type.as_deref(), Some("api-call-via-trail"));
    }

    #[test]
    fn test_result_constructors() {
        let ok = NotificationResult::success("alice", "alice@example.com", "pw");
        assert!(ok.is_success());
        assert!(ok.error_kind.is_none());

        let skip = NotificationResult::skipped("userName missing");
        assert!(skip.is_skipped());
        assert_eq!(skip.error_kind, Some(NotificationErrorKind::MalformedEvent));

        let fail = NotificationResult::failure(
            Some("alice".to_string()),
            NotificationErrorKind::LookupNotFound,
            "key not found",
        );
        assert_eq!(fail.status, NotificationStatus::Failure);
        assert!(fail.credential.is_none());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let ok = NotificationResult::success("alice", "alice@example.com", "pw");
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "SUCCESS");
        assert_eq!(json["contactAddress"], "alice@example.com");
    }
}
