//! KeyRelay Event Source
//!
//! Consumes raw audit events from a delivery queue. The transport promises
//! at-least-once delivery; the pipeline downstream is idempotent, so
//! redelivery of the same event is harmless.

use async_trait::async_trait;
use thiserror::Error;

use kr_common::AuditEvent;

pub mod memory;

#[cfg(feature = "sqs")]
pub mod sqs;

pub use memory::InMemoryEventConsumer;

#[cfg(feature = "sqs")]
pub use sqs::SqsEventConsumer;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Queue is stopped")]
    Stopped,

    #[error("AWS SQS error: {0}")]
    Sqs(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, QueueError>;

/// An audit event received from the queue with tracking metadata
#[derive(Debug, Clone)]
pub struct ReceivedEvent {
    pub event: AuditEvent,
    pub receipt_handle: String,
    /// Broker-assigned message id, when the transport provides one
    pub broker_message_id: Option<String>,
    pub queue_identifier: String,
}

/// Trait for consuming audit events from a queue
#[async_trait]
pub trait EventConsumer: Send + Sync {
    /// Get the unique identifier for this consumer
    fn identifier(&self) -> &str;

    /// Poll for events from the queue
    async fn poll(&self, max_events: u32) -> Result<Vec<ReceivedEvent>>;

    /// Acknowledge an event (remove from queue)
    async fn ack(&self, receipt_handle: &str) -> Result<()>;

    /// Negative acknowledge an event (make visible again after delay)
    async fn nack(&self, receipt_handle: &str, delay_seconds: Option<u32>) -> Result<()>;

    /// Check if the consumer is healthy
    fn is_healthy(&self) -> bool;

    /// Stop the consumer
    async fn stop(&self);
}
