//! KeyRelay Notification Pipeline
//!
//! The event-driven core: a declarative pattern selects identity-creation
//! events from the audit stream, a dispatcher invokes the notification
//! handler once per matched event under a bounded timeout, and the handler
//! resolves the new identity's contact address and the shared one-time
//! credential before recording a structured notification.
//!
//! The handler is stateless and performs no writes, so the at-least-once
//! delivery of the surrounding transport is naturally idempotent.

pub mod dispatcher;
pub mod event;
pub mod handler;
pub mod matcher;
pub mod sink;

// Re-export key types
pub use dispatcher::{DispatchError, Dispatcher, DispatcherStats, MATCHER_PRINCIPAL};
pub use event::{parse_event, ParsedEvent};
pub use handler::{HandlerConfig, NotificationHandler};
pub use matcher::EventPattern;
pub use sink::{InMemorySink, LogSink, NotificationSink};
