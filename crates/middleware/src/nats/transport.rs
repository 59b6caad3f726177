use std::time::Duration;

use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tracing::info;

use crate::error::TransportError;
use crate::transport::{Subscription, Transport, TransportMessage};

/// Default upper bound on waiting for the server to acknowledge a flush
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings for the shared producer handle
#[derive(Debug, Clone)]
pub struct NatsConfig {
    /// Comma-separated server list, e.g. "broker1:9092,broker2:19092"
    pub servers: String,
    /// Connection name reported to the server
    pub client_name: String,
    /// Bounds each publish and each flush
    pub flush_timeout: Duration,
}

impl NatsConfig {
    pub fn new(servers: impl Into<String>, client_name: impl Into<String>) -> Self {
        Self {
            servers: servers.into(),
            client_name: client_name.into(),
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        }
    }

    pub fn with_flush_timeout(mut self, flush_timeout: Duration) -> Self {
        self.flush_timeout = flush_timeout;
        self
    }
}

/// NATS subscription wrapper
struct NatsSubscription {
    subscriber: async_nats::Subscriber,
}

#[async_trait]
impl Subscription for NatsSubscription {
    async fn next(&mut self) -> Result<TransportMessage, TransportError> {
        let msg = self
            .subscriber
            .next()
            .await
            .ok_or_else(|| TransportError::SubscribeFailed("subscription closed".to_string()))?;

        Ok(TransportMessage {
            subject: msg.subject.to_string(),
            payload: msg.payload,
            sequence: None,
        })
    }
}

/// NATS transport implementation.
///
/// Wraps a single `async_nats::Client`; the client multiplexes concurrent
/// publishes over one connection, so one `NatsTransport` serves every task.
pub struct NatsTransport {
    client: Client,
    flush_timeout: Duration,
}

impl NatsTransport {
    /// Create a new NatsTransport from an existing client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        }
    }

    /// Connect to the server list and create transport
    pub async fn connect(config: &NatsConfig) -> Result<Self, TransportError> {
        info!(
            servers = %config.servers,
            client = %config.client_name,
            "Connecting to broker"
        );

        let client = ConnectOptions::new()
            .name(&config.client_name)
            .connect(config.servers.as_str())
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            flush_timeout: config.flush_timeout,
        })
    }
}

#[async_trait]
impl Transport for NatsTransport {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), TransportError> {
        // Blocks while the client's command queue is full, e.g. during an outage
        tokio::time::timeout(
            self.flush_timeout,
            self.client.publish(subject.to_string(), payload),
        )
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(|e| TransportError::PublishFailed(e.to_string()))
    }

    async fn flush(&self) -> Result<(), TransportError> {
        tokio::time::timeout(self.flush_timeout, self.client.flush())
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::FlushFailed(e.to_string()))
    }

    async fn subscribe(&self, subject: &str) -> Result<Box<dyn Subscription>, TransportError> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| TransportError::SubscribeFailed(e.to_string()))?;
        Ok(Box::new(NatsSubscription { subscriber }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = NatsConfig::new("broker1:9092,broker2:19092", "crypto-price-producer");
        assert_eq!(config.servers, "broker1:9092,broker2:19092");
        assert_eq!(config.client_name, "crypto-price-producer");
        assert_eq!(config.flush_timeout, DEFAULT_FLUSH_TIMEOUT);
    }

    #[test]
    fn test_config_flush_timeout_override() {
        let config = NatsConfig::new("localhost:4222", "test")
            .with_flush_timeout(Duration::from_millis(250));
        assert_eq!(config.flush_timeout, Duration::from_millis(250));
    }

    // Note: These tests require a running NATS server
    // Run: docker run -p 4222:4222 nats:latest

    #[tokio::test]
    #[ignore] // Requires NATS server
    async fn test_publish_and_flush_succeed() {
        let config = NatsConfig::new("localhost:4222", "test");
        let transport = NatsTransport::connect(&config).await.unwrap();
        transport
            .publish("crypto-prices", Bytes::from("hello"))
            .await
            .unwrap();
        assert!(transport.flush().await.is_ok());
    }
}
