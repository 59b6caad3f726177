//! pricefeed-connector: trade feed to broker bridge
//!
//! This crate provides the components that hold a WebSocket connection to the
//! upstream price feed, subscribe to symbols, and republish every trade record
//! to a broker topic.

pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod encoding;
pub mod error;
pub mod finnhub;
pub mod metrics;
pub mod publisher;
pub mod retry;
pub mod server;
pub mod traits;

#[cfg(test)]
mod test_helpers;

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use dispatcher::{DecodeErrorPolicy, FrameDispatcher, FrameOutcome};
pub use error::ConnectorError;
pub use metrics::BridgeMetrics;
pub use publisher::{BrokerPublisher, PublishOutcome};
pub use retry::{Backoff, Exhausted, RetryPolicy};
pub use server::{create_router, run_server, ServerState};
pub use traits::FrameSink;
