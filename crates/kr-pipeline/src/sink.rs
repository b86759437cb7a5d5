//! Notification Sink
//!
//! The handler's only side effect is recording a result on an injected sink,
//! keeping the core logic pure and testable independent of the delivery
//! channel.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{error, info};

use kr_common::{NotificationResult, NotificationStatus};

/// Capability for recording notification results
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Record one result. Fire-and-forget; delivery and retention belong to
    /// the channel behind the sink.
    async fn record(&self, result: &NotificationResult);
}

/// Sink writing results to the structured log channel.
///
/// SECURITY REVIEW: the success entry carries the plaintext one-time
/// credential. This mirrors the bootstrap workflow this pipeline replaces
/// and is intentional until that workflow changes; deployments that must not
/// log secrets should substitute another `NotificationSink`.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn record(&self, result: &NotificationResult) {
        match result.status {
            NotificationStatus::Success => {
                info!(
                    identity = result.identity.as_deref().unwrap_or("-"),
                    contact_address = result.contact_address.as_deref().unwrap_or("-"),
                    credential = result.credential.as_deref().unwrap_or("-"),
                    "New identity provisioned, one-time credential issued"
                );
            }
            NotificationStatus::Skipped | NotificationStatus::Failure => {
                error!(
                    status = ?result.status,
                    identity = result.identity.as_deref().unwrap_or("-"),
                    error_kind = %result
                        .error_kind
                        .map(|k| k.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    error_detail = result.error_detail.as_deref().unwrap_or("-"),
                    "Identity notification not delivered"
                );
            }
        }
    }
}

/// In-memory sink for tests
#[derive(Default)]
pub struct InMemorySink {
    recorded: Mutex<Vec<NotificationResult>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<NotificationResult> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.recorded.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NotificationSink for InMemorySink {
    async fn record(&self, result: &NotificationResult) {
        self.recorded.lock().unwrap().push(result.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_sink_records() {
        let sink = InMemorySink::new();
        assert!(sink.is_empty());

        sink.record(&NotificationResult::success("alice", "alice@example.com", "pw"))
            .await;
        sink.record(&NotificationResult::skipped("no userName")).await;

        let recorded = sink.recorded();
        assert_eq!(recorded.len(), 2);
        assert!(recorded[0].is_success());
        assert!(recorded[1].is_skipped());
    }
}
