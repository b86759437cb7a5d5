//! Event Matcher
//!
//! A declarative predicate over audit events. Every pattern field must match
//! the event exactly (case-sensitive); a missing event field never matches.
//! No wildcards, no partial matching, no side effects — events that do not
//! match are simply dropped by the caller.

use kr_common::AuditEvent;
use serde::{Deserialize, Serialize};

/// Exact-match pattern selecting identity-creation events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPattern {
    pub source: String,
    pub detail_type: String,
    pub event_source: String,
    pub event_name: String,
}

impl Default for EventPattern {
    /// The pattern for identity-creation events on the provisioning audit trail.
    fn default() -> Self {
        Self {
            source: "identity-provisioning-audit".to_string(),
            detail_type: "api-call-via-trail".to_string(),
            event_source: "iam-service".to_string(),
            event_name: "CreateUser".to_string(),
        }
    }
}

impl EventPattern {
    /// Check whether an event satisfies every pattern field.
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if event.source.as_deref() != Some(self.source.as_str()) {
            return false;
        }
        if event.detail_type.as_deref() != Some(self.detail_type.as_str()) {
            return false;
        }

        let Some(detail) = event.detail.as_ref() else {
            return false;
        };

        detail.event_source.as_deref() == Some(self.event_source.as_str())
            && detail.event_name.as_deref() == Some(self.event_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kr_common::{AuditEventDetail, RequestParameters};

    fn creation_event() -> AuditEvent {
        AuditEvent {
            source: Some("identity-provisioning-audit".to_string()),
            detail_type: Some("api-call-via-trail".to_string()),
            detail: Some(AuditEventDetail {
                event_source: Some("iam-service".to_string()),
                event_name: Some("CreateUser".to_string()),
                request_parameters: Some(RequestParameters {
                    user_name: Some("alice".to_string()),
                }),
            }),
        }
    }

    #[test]
    fn test_matches_creation_event() {
        assert!(EventPattern::default().matches(&creation_event()));
    }

    #[test]
    fn test_rejects_other_event_name() {
        let mut event = creation_event();
        event.detail.as_mut().unwrap().event_name = Some("DeleteUser".to_string());
        assert!(!EventPattern::default().matches(&event));
    }

    #[test]
    fn test_rejects_other_event_source() {
        let mut event = creation_event();
        event.detail.as_mut().unwrap().event_source = Some("sts-service".to_string());
        assert!(!EventPattern::default().matches(&event));
    }

    #[test]
    fn test_rejects_other_source() {
        let mut event = creation_event();
        event.source = Some("billing-audit".to_string());
        assert!(!EventPattern::default().matches(&event));
    }

    #[test]
    fn test_rejects_other_detail_type() {
        let mut event = creation_event();
        event.detail_type = Some("scheduled".to_string());
        assert!(!EventPattern::default().matches(&event));
    }

    #[test]
    fn test_rejects_missing_fields() {
        assert!(!EventPattern::default().matches(&AuditEvent::default()));

        let mut event = creation_event();
        event.detail = None;
        assert!(!EventPattern::default().matches(&event));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let mut event = creation_event();
        event.detail.as_mut().unwrap().event_name = Some("createuser".to_string());
        assert!(!EventPattern::default().matches(&event));
    }

    #[test]
    fn test_matches_regardless_of_user_name() {
        // The pattern only inspects routing fields; a malformed payload still
        // matches and is handled downstream.
        let mut event = creation_event();
        event.detail.as_mut().unwrap().request_parameters = None;
        assert!(EventPattern::default().matches(&event));
    }
}
