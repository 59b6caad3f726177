//! Broker publisher
//!
//! Serializes one trade record and hands it to the shared transport, then
//! waits for the broker to acknowledge it. Failures are logged with the
//! record and swallowed: delivery is best-effort, at most once.

use std::sync::Arc;
use std::time::Duration;

use pricefeed_middleware::{Transport, TransportError};
use serde_json::Value;
use tracing::{error, trace};

use crate::config::DEFAULT_PUBLISH_TIMEOUT;
use crate::encoding::to_payload;
use crate::metrics::BridgeMetrics;

/// Result of one publish attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    Failed,
}

/// Publishes trade records to a single fixed topic
pub struct BrokerPublisher {
    transport: Arc<dyn Transport>,
    topic: Arc<str>,
    metrics: BridgeMetrics,
    /// Bound on publish plus acknowledgment for one record
    timeout: Duration,
}

impl BrokerPublisher {
    pub fn new(
        transport: Arc<dyn Transport>,
        topic: impl Into<Arc<str>>,
        metrics: BridgeMetrics,
    ) -> Self {
        Self {
            transport,
            topic: topic.into(),
            metrics,
            timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Publish one record and wait for the acknowledgment. Never fails:
    /// broker errors are logged and reported as `PublishOutcome::Failed`.
    pub async fn publish(&self, record: &Value) -> PublishOutcome {
        match self.try_publish(record).await {
            Ok(()) => {
                trace!(topic = %self.topic, "Record published");
                self.metrics.inc_published();
                PublishOutcome::Published
            }
            Err(e) => {
                error!(
                    topic = %self.topic,
                    record = %record,
                    error = %e,
                    "Error producing message to broker: {}",
                    e
                );
                self.metrics.inc_failed();
                PublishOutcome::Failed
            }
        }
    }

    async fn try_publish(&self, record: &Value) -> Result<(), TransportError> {
        let payload =
            to_payload(record).map_err(|e| TransportError::PublishFailed(e.to_string()))?;
        tokio::time::timeout(self.timeout, async {
            self.transport.publish(&self.topic, payload).await?;
            self.transport.flush().await
        })
        .await
        .map_err(|_| TransportError::Timeout)?
    }
}
