//! Bridge orchestration
//!
//! Connects to the feed, subscribes every configured symbol, then drives the
//! receive loop, handing each frame to the dispatcher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::Stream;
use pricefeed_middleware::Transport;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{error, info, warn};

use crate::config::BridgeConfig;
use crate::dispatcher::FrameDispatcher;
use crate::error::ConnectorError;
use crate::finnhub::{for_each_frame, subscribe_all, FeedConnection};
use crate::metrics::BridgeMetrics;
use crate::publisher::BrokerPublisher;
use crate::traits::FrameSink;

/// Bridges one feed connection to the broker
pub struct Bridge {
    feed_name: String,
    config: BridgeConfig,
    transport: Arc<dyn Transport>,
    metrics: BridgeMetrics,
    connected: Arc<AtomicBool>,
}

impl Bridge {
    pub fn new(
        feed_name: impl Into<String>,
        config: BridgeConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let feed_name = feed_name.into();
        Self {
            metrics: BridgeMetrics::new(feed_name.clone()),
            feed_name,
            config,
            transport,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns whether the feed is connected and subscribed
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Returns a handle to the connected status
    pub fn connected_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.connected)
    }

    /// Connect to the feed and run until shutdown or disconnect.
    ///
    /// Returns `Ok(())` only on a requested shutdown.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<(), ConnectorError> {
        let url = self.config.feed_url()?;
        let connection = FeedConnection::connect(&url, &self.config.redacted_feed_url()).await?;
        let (sink, frames) = connection.split();

        let result = self.run_with(&sink, frames, shutdown).await;

        if result.is_ok() {
            if let Err(e) = sink.close().await {
                warn!(error = %e, "Failed to close feed WebSocket");
            }
        }
        result
    }

    /// Subscribe and receive over an already open connection.
    pub async fn run_with<S, F>(
        &self,
        sink: &S,
        frames: F,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), ConnectorError>
    where
        S: FrameSink + ?Sized,
        F: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        subscribe_all(
            sink,
            &self.config.symbols,
            &self.config.subscribe_retry,
            &self.metrics,
        )
        .await?;

        self.connected.store(true, Ordering::SeqCst);
        self.metrics.set_connected();
        info!(
            feed = %self.feed_name,
            symbols = self.config.symbols.len(),
            topic = %self.config.topic,
            "Subscribed, bridging trades to broker"
        );

        let publisher = Arc::new(BrokerPublisher::new(
            Arc::clone(&self.transport),
            self.config.topic.as_str(),
            self.metrics.clone(),
        )
        .with_timeout(self.config.publish_timeout));
        let dispatcher =
            FrameDispatcher::new(publisher, self.config.decode_errors, self.metrics.clone());
        let dispatcher = &dispatcher;

        let result = for_each_frame(frames, self.config.read_timeout, shutdown, move |text| {
            async move { dispatcher.handle_frame(&text).await.map(|_| ()) }
        })
        .await;

        self.connected.store(false, Ordering::SeqCst);
        self.metrics.set_disconnected();

        match &result {
            Ok(()) => info!(feed = %self.feed_name, "Bridge stopped"),
            Err(e) => error!(feed = %self.feed_name, error = %e, "Bridge stopped on error"),
        }
        result
    }
}
