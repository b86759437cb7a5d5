//! In-memory event consumer for testing

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use kr_common::AuditEvent;

use crate::{EventConsumer, QueueError, ReceivedEvent, Result};

/// In-memory event consumer backed by a simple FIFO
///
/// `push` enqueues events; acked events are removed, nacked events are
/// requeued at the back, mimicking redelivery.
pub struct InMemoryEventConsumer {
    identifier: String,
    pending: Mutex<VecDeque<ReceivedEvent>>,
    running: AtomicBool,
    next_receipt: AtomicU64,
    acked: Mutex<Vec<String>>,
    nacked: Mutex<Vec<String>>,
}

impl InMemoryEventConsumer {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            pending: Mutex::new(VecDeque::new()),
            running: AtomicBool::new(true),
            next_receipt: AtomicU64::new(1),
            acked: Mutex::new(Vec::new()),
            nacked: Mutex::new(Vec::new()),
        }
    }

    /// Enqueue an event for delivery.
    pub fn push(&self, event: AuditEvent) -> String {
        let receipt = format!("receipt-{}", self.next_receipt.fetch_add(1, Ordering::SeqCst));
        self.pending.lock().unwrap().push_back(ReceivedEvent {
            event,
            receipt_handle: receipt.clone(),
            broker_message_id: None,
            queue_identifier: self.identifier.clone(),
        });
        receipt
    }

    pub fn acked(&self) -> Vec<String> {
        self.acked.lock().unwrap().clone()
    }

    pub fn nacked(&self) -> Vec<String> {
        self.nacked.lock().unwrap().clone()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

#[async_trait]
impl EventConsumer for InMemoryEventConsumer {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn poll(&self, max_events: u32) -> Result<Vec<ReceivedEvent>> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(QueueError::Stopped);
        }

        let mut pending = self.pending.lock().unwrap();
        let count = (max_events as usize).min(pending.len());
        Ok(pending.drain(..count).collect())
    }

    async fn ack(&self, receipt_handle: &str) -> Result<()> {
        self.acked.lock().unwrap().push(receipt_handle.to_string());
        Ok(())
    }

    async fn nack(&self, receipt_handle: &str, _delay_seconds: Option<u32>) -> Result<()> {
        self.nacked.lock().unwrap().push(receipt_handle.to_string());
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
