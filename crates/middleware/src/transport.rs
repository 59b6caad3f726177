use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;

/// Message envelope with metadata
#[derive(Debug, Clone)]
pub struct TransportMessage {
    pub subject: String,
    pub payload: Bytes,
    pub sequence: Option<u64>,
}

/// Subscription handle for receiving messages
#[async_trait]
pub trait Subscription: Send + Sync {
    /// Receive next message (blocks until available)
    async fn next(&mut self) -> Result<TransportMessage, TransportError>;
}

/// Transport abstraction for the record broker.
///
/// Implementations must tolerate concurrent `publish`/`flush` calls from
/// many tasks sharing one handle.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Hand a payload to the client (buffered, not yet acknowledged)
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), TransportError>;

    /// Wait until everything handed to `publish` has been accepted by the broker
    async fn flush(&self) -> Result<(), TransportError>;

    /// Subscribe to a subject
    async fn subscribe(&self, subject: &str) -> Result<Box<dyn Subscription>, TransportError>;
}
