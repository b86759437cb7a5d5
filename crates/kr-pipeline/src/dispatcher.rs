//! Dispatcher
//!
//! Invocation layer between the event matcher and the notification handler.
//! Enforces the authorization boundary (only the matcher principal may
//! invoke), bounds every invocation with a timeout, and contains handler
//! panics so nothing escapes as an unhandled fault. The underlying delivery
//! system is at-least-once; the handler performs no writes, so duplicate
//! dispatch of the same event is harmless.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};
use uuid::Uuid;

use kr_common::{AuditEvent, NotificationErrorKind, NotificationResult, NotificationStatus};

use crate::handler::NotificationHandler;

/// The only principal allowed to invoke the handler.
pub const MATCHER_PRINCIPAL: &str = "event-matcher";

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("principal '{0}' is not authorized to invoke the notification handler")]
    Unauthorized(String),
}

/// Dispatcher invocation statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatcherStats {
    pub invocations: u64,
    pub successes: u64,
    pub skipped: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub last_dispatch_at: Option<DateTime<Utc>>,
}

/// Dispatcher - invokes the notification handler once per matched event
pub struct Dispatcher {
    handler: Arc<NotificationHandler>,
    invocation_timeout: Duration,
    stats: Arc<RwLock<DispatcherStats>>,
}

impl Dispatcher {
    pub fn new(handler: Arc<NotificationHandler>, invocation_timeout: Duration) -> Self {
        Self {
            handler,
            invocation_timeout,
            stats: Arc::new(RwLock::new(DispatcherStats::default())),
        }
    }

    /// Invoke the handler once with the full event payload, unmodified.
    ///
    /// Returns `DispatchError::Unauthorized` for any principal other than
    /// the matcher. Every other outcome — including timeout and a panicking
    /// handler task — is a structured `NotificationResult`.
    pub async fn dispatch(
        &self,
        principal: &str,
        event: AuditEvent,
    ) -> Result<NotificationResult, DispatchError> {
        if principal != MATCHER_PRINCIPAL {
            warn!(principal = %principal, "Rejected handler invocation from unauthorized principal");
            return Err(DispatchError::Unauthorized(principal.to_string()));
        }

        let invocation_id = Uuid::new_v4();
        debug!(invocation_id = %invocation_id, "Dispatching identity-creation event");

        let handler = self.handler.clone();
        let mut task = tokio::spawn(async move { handler.handle(&event).await });

        let result = match tokio::time::timeout(self.invocation_timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                // A panic inside the handler task ends here, not in the caller
                error!(
                    invocation_id = %invocation_id,
                    error = %join_error,
                    "Handler task failed"
                );
                NotificationResult::failure(
                    None,
                    NotificationErrorKind::InternalFault,
                    format!("handler task failed: {}", join_error),
                )
            }
            Err(_) => {
                // Abandon outstanding lookups along with the task
                task.abort();
                error!(
                    invocation_id = %invocation_id,
                    timeout_seconds = self.invocation_timeout.as_secs(),
                    "Handler invocation timed out"
                );
                NotificationResult::failure(
                    None,
                    NotificationErrorKind::Timeout,
                    format!(
                        "invocation exceeded {} second bound",
                        self.invocation_timeout.as_secs()
                    ),
                )
            }
        };

        self.record_outcome(&result).await;
        Ok(result)
    }

    async fn record_outcome(&self, result: &NotificationResult) {
        let mut stats = self.stats.write().await;
        stats.invocations += 1;
        match result.status {
            NotificationStatus::Success => stats.successes += 1,
            NotificationStatus::Skipped => stats.skipped += 1,
            NotificationStatus::Failure => {
                stats.failures += 1;
                if result.error_kind == Some(NotificationErrorKind::Timeout) {
                    stats.timeouts += 1;
                }
            }
        }
        stats.last_dispatch_at = Some(Utc::now());
    }

    /// Get current stats
    pub async fn stats(&self) -> DispatcherStats {
        self.stats.read().await.clone()
    }
}
