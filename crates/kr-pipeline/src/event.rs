//! Event Parsing
//!
//! One dedicated step turns an untrusted audit event into an explicit parse
//! result. The handler only ever sees `Valid` or `Malformed`; no field
//! probing happens anywhere else.

use kr_common::AuditEvent;

/// Result of parsing an audit event for the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedEvent {
    /// The event names the created identity.
    Valid { identity_name: String },
    /// A required field is missing or empty. Dropped, never retried.
    Malformed { reason: String },
}

/// Extract the created identity's name from an audit event.
///
/// Absent nesting at any level and an empty name are both malformed; the
/// distinction only matters for the logged reason.
pub fn parse_event(event: &AuditEvent) -> ParsedEvent {
    let Some(detail) = event.detail.as_ref() else {
        return ParsedEvent::Malformed {
            reason: "event has no detail".to_string(),
        };
    };

    let Some(params) = detail.request_parameters.as_ref() else {
        return ParsedEvent::Malformed {
            reason: "event detail has no requestParameters".to_string(),
        };
    };

    match params.user_name.as_deref() {
        None => ParsedEvent::Malformed {
            reason: "requestParameters has no userName".to_string(),
        },
        Some("") => ParsedEvent::Malformed {
            reason: "userName is empty".to_string(),
        },
        Some(name) => ParsedEvent::Valid {
            identity_name: name.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kr_common::{AuditEventDetail, RequestParameters};

    fn event_with_user(user_name: Option<&str>) -> AuditEvent {
        AuditEvent {
            source: Some("identity-provisioning-audit".to_string()),
            detail_type: Some("api-call-via-trail".to_string()),
            detail: Some(AuditEventDetail {
                event_source: Some("iam-service".to_string()),
                event_name: Some("CreateUser".to_string()),
                request_parameters: Some(RequestParameters {
                    user_name: user_name.map(|s| s.to_string()),
                }),
            }),
        }
    }

    #[test]
    fn test_valid_event() {
        let parsed = parse_event(&event_with_user(Some("s3-user")));
        assert_eq!(
            parsed,
            ParsedEvent::Valid {
                identity_name: "s3-user".to_string()
            }
        );
    }

    #[test]
    fn test_missing_detail() {
        let parsed = parse_event(&AuditEvent::default());
        assert!(matches!(parsed, ParsedEvent::Malformed { .. }));
    }

    #[test]
    fn test_missing_request_parameters() {
        let mut event = event_with_user(Some("s3-user"));
        event.detail.as_mut().unwrap().request_parameters = None;
        assert!(matches!(parse_event(&event), ParsedEvent::Malformed { .. }));
    }

    #[test]
    fn test_missing_user_name() {
        let parsed = parse_event(&event_with_user(None));
        assert!(matches!(parsed, ParsedEvent::Malformed { .. }));
    }

    #[test]
    fn test_empty_user_name() {
        let parsed = parse_event(&event_with_user(Some("")));
        assert_eq!(
            parsed,
            ParsedEvent::Malformed {
                reason: "userName is empty".to_string()
            }
        );
    }
}
