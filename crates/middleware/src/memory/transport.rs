use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::error::TransportError;
use crate::transport::{Subscription, Transport, TransportMessage};

const CHANNEL_BUFFER_SIZE: usize = 1024;

pub struct InMemoryTransport {
    channels: DashMap<String, broadcast::Sender<TransportMessage>>,
    sequence: AtomicU64,
    flushes: AtomicU64,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            sequence: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
        }
    }

    /// Number of messages published so far, across all subjects
    pub fn published_count(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Number of completed flushes
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::SeqCst)
    }

    #[inline]
    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    fn get_or_create_channel(&self, subject: &str) -> broadcast::Sender<TransportMessage> {
        self.channels
            .entry(subject.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_BUFFER_SIZE).0)
            .clone()
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

struct InMemorySubscription {
    rx: broadcast::Receiver<TransportMessage>,
}

#[async_trait]
impl Subscription for InMemorySubscription {
    async fn next(&mut self) -> Result<TransportMessage, TransportError> {
        self.rx
            .recv()
            .await
            .map_err(|e| TransportError::SubscribeFailed(e.to_string()))
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), TransportError> {
        let tx = self.get_or_create_channel(subject);
        let seq = self.next_sequence();
        let msg = TransportMessage {
            subject: subject.to_string(),
            payload,
            sequence: Some(seq),
        };
        // No subscribers is not an error: the broker accepted the message.
        let _ = tx.send(msg);
        Ok(())
    }

    async fn flush(&self) -> Result<(), TransportError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<Box<dyn Subscription>, TransportError> {
        let tx = self.get_or_create_channel(subject);
        let rx = tx.subscribe();
        Ok(Box::new(InMemorySubscription { rx }))
    }
}
