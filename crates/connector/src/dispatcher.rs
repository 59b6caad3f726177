//! Frame dispatcher
//!
//! Decodes each inbound frame and fans trade records out to the publisher.
//! All publishes of one frame run concurrently and are joined before the
//! dispatcher returns, so at most one frame's worth of records is in flight.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::error::ConnectorError;
use crate::finnhub::messages::InboundFrame;
use crate::metrics::BridgeMetrics;
use crate::publisher::{BrokerPublisher, PublishOutcome};

/// Characters of a malformed frame kept in the log line
const PREVIEW_CHARS: usize = 500;

/// What to do with a frame that is not valid JSON (or not an object)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeErrorPolicy {
    /// Log, count and move on to the next frame
    #[default]
    Skip,
    /// Fail the frame, which ends the receive loop
    Abort,
}

/// Result of handling one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Not a trade frame
    Ignored { frame_type: String },
    /// Trade frame; counts of records acknowledged and dropped
    Trade { published: usize, failed: usize },
    /// Undecodable frame skipped under `DecodeErrorPolicy::Skip`
    Malformed,
}

pub struct FrameDispatcher {
    publisher: Arc<BrokerPublisher>,
    decode_errors: DecodeErrorPolicy,
    metrics: BridgeMetrics,
}

impl FrameDispatcher {
    pub fn new(
        publisher: Arc<BrokerPublisher>,
        decode_errors: DecodeErrorPolicy,
        metrics: BridgeMetrics,
    ) -> Self {
        Self {
            publisher,
            decode_errors,
            metrics,
        }
    }

    pub async fn handle_frame(&self, text: &str) -> Result<FrameOutcome, ConnectorError> {
        debug!(message = %text, "Received message");

        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                self.metrics.inc_decode_error();
                let preview: String = text.chars().take(PREVIEW_CHARS).collect();
                return match self.decode_errors {
                    DecodeErrorPolicy::Skip => {
                        warn!(error = %e, preview = %preview, "Skipping undecodable frame");
                        Ok(FrameOutcome::Malformed)
                    }
                    DecodeErrorPolicy::Abort => {
                        warn!(error = %e, preview = %preview, "Undecodable frame, aborting");
                        Err(ConnectorError::Decode(e))
                    }
                };
            }
        };

        self.metrics.inc_frame(frame.frame_type());

        let records = match frame {
            InboundFrame::Trade { records } => records,
            InboundFrame::Other { frame_type } => {
                return Ok(FrameOutcome::Ignored { frame_type });
            }
        };

        let outcomes = join_all(records.iter().map(|record| self.publisher.publish(record))).await;

        let published = outcomes
            .iter()
            .filter(|o| **o == PublishOutcome::Published)
            .count();
        let failed = outcomes.len() - published;
        if failed > 0 {
            warn!(published, failed, "Some trade records were dropped");
        }

        Ok(FrameOutcome::Trade { published, failed })
    }
}
