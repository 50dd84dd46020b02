//! Offline outbox for chat messages.
//!
//! This crate provides:
//! - MessageQueueManager: durable queue with single-flight flushes, a periodic
//!   flush timer while non-empty, and flush-on-reconnect
//! - QueuedMessage: one message awaiting confirmed delivery
//! - HttpMessageSender: JSON-over-HTTPS implementation of the send port

mod error;
mod manager;
mod message;
mod sender;

pub use error::{OutboxError, OutboxResult};
pub use manager::{
    FlushOutcome, FlushReport, MessageQueueManager, QueueConfig, QueuePorts, QueueStatus,
    DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_SEND_ATTEMPTS,
};
pub use message::{MessageStatus, NewQueuedMessage, QueuedMessage};
pub use sender::{HttpMessageSender, MessageSender, SenderConfig};
