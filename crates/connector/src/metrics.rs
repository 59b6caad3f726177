//! Prometheus metrics for the bridge
//!
//! Counts frames, republished records and subscription attempts per feed.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter_vec, register_int_gauge_vec, Encoder, IntCounterVec, IntGaugeVec,
    TextEncoder,
};

/// Labels used for metrics
const LABEL_FEED: &str = "feed";
const LABEL_FRAME_TYPE: &str = "frame_type";
const LABEL_SYMBOL: &str = "symbol";
const LABEL_OUTCOME: &str = "outcome";

/// Inbound frames by frame type
static FRAMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "pricefeed_bridge_frames_total",
        "Total frames received from the upstream feed",
        &[LABEL_FEED, LABEL_FRAME_TYPE]
    )
    .expect("Failed to register frames_total metric")
});

/// Records acknowledged by the broker
static RECORDS_PUBLISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "pricefeed_bridge_records_published_total",
        "Trade records acknowledged by the broker",
        &[LABEL_FEED]
    )
    .expect("Failed to register records_published_total metric")
});

/// Records dropped because the broker rejected them
static RECORDS_FAILED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "pricefeed_bridge_records_failed_total",
        "Trade records dropped after a failed publish",
        &[LABEL_FEED]
    )
    .expect("Failed to register records_failed_total metric")
});

/// Frames that could not be decoded
static DECODE_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "pricefeed_bridge_decode_errors_total",
        "Inbound frames that failed to decode",
        &[LABEL_FEED]
    )
    .expect("Failed to register decode_errors_total metric")
});

/// Subscribe attempts per symbol and outcome (ok / error)
static SUBSCRIPTION_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "pricefeed_bridge_subscription_attempts_total",
        "Subscribe requests sent, by symbol and outcome",
        &[LABEL_FEED, LABEL_SYMBOL, LABEL_OUTCOME]
    )
    .expect("Failed to register subscription_attempts_total metric")
});

/// Feed connection status (1 = connected, 0 = disconnected)
static WEBSOCKET_CONNECTED: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "pricefeed_bridge_websocket_connected",
        "Upstream feed connection status (1=connected, 0=disconnected)",
        &[LABEL_FEED]
    )
    .expect("Failed to register websocket_connected metric")
});

/// Handle for recording metrics for one bridge instance
#[derive(Clone, Debug)]
pub struct BridgeMetrics {
    feed: String,
}

impl BridgeMetrics {
    pub fn new(feed: impl Into<String>) -> Self {
        Self { feed: feed.into() }
    }

    pub fn inc_frame(&self, frame_type: &str) {
        FRAMES_TOTAL
            .with_label_values(&[&self.feed, frame_type])
            .inc();
    }

    pub fn inc_published(&self) {
        RECORDS_PUBLISHED.with_label_values(&[&self.feed]).inc();
    }

    pub fn inc_failed(&self) {
        RECORDS_FAILED.with_label_values(&[&self.feed]).inc();
    }

    pub fn inc_decode_error(&self) {
        DECODE_ERRORS.with_label_values(&[&self.feed]).inc();
    }

    pub fn inc_subscription_attempt(&self, symbol: &str, ok: bool) {
        let outcome = if ok { "ok" } else { "error" };
        SUBSCRIPTION_ATTEMPTS
            .with_label_values(&[&self.feed, symbol, outcome])
            .inc();
    }

    pub fn set_connected(&self) {
        WEBSOCKET_CONNECTED.with_label_values(&[&self.feed]).set(1);
    }

    pub fn set_disconnected(&self) {
        WEBSOCKET_CONNECTED.with_label_values(&[&self.feed]).set(0);
    }

    /// Published-record count, mostly useful in tests
    pub fn published(&self) -> u64 {
        RECORDS_PUBLISHED.with_label_values(&[&self.feed]).get()
    }

    pub fn failed(&self) -> u64 {
        RECORDS_FAILED.with_label_values(&[&self.feed]).get()
    }

    pub fn decode_errors(&self) -> u64 {
        DECODE_ERRORS.with_label_values(&[&self.feed]).get()
    }
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| {
        prometheus::Error::Msg(format!("Failed to encode metrics as UTF-8: {}", e))
    })
}
