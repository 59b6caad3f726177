//! Bridge configuration
//!
//! Every constant the bridge runs with lives here with its default. The
//! binary layers CLI/env overrides on top of `BridgeConfig::new`.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::dispatcher::DecodeErrorPolicy;
use crate::error::ConnectorError;
use crate::retry::RetryPolicy;

/// Environment variable carrying the feed credential
pub const API_KEY_ENV: &str = "FINNHUB_API_KEY";
/// Upstream feed endpoint (credential is appended as `?token=`)
pub const DEFAULT_FEED_URL: &str = "wss://ws.finnhub.io";
/// Broker bootstrap servers
pub const DEFAULT_BROKER_SERVERS: &str = "broker1:9092,broker2:19092,broker3:29092";
/// Client identity presented to the broker
pub const DEFAULT_CLIENT_NAME: &str = "crypto-price-producer";
/// Destination topic for every trade record
pub const DEFAULT_TOPIC: &str = "crypto-prices";
/// Symbols subscribed at startup
pub const DEFAULT_SYMBOLS: [&str; 3] = ["BINANCE:BTCUSDT", "BINANCE:ETHUSDT", "BINANCE:DOGEUSDT"];
/// Feed is considered dead after this long without any frame
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(120);
/// Upper bound on one broker acknowledgment
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct BridgeConfig {
    pub feed_url: String,
    api_key: String,
    pub symbols: Vec<String>,
    pub broker_servers: String,
    pub client_name: String,
    pub topic: String,
    pub subscribe_retry: RetryPolicy,
    pub decode_errors: DecodeErrorPolicy,
    /// `None` waits forever for the next frame
    pub read_timeout: Option<Duration>,
    pub publish_timeout: Duration,
}

impl BridgeConfig {
    /// Build a config with defaults. Fails if the credential is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConnectorError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConnectorError::Config(format!("{} not set", API_KEY_ENV)));
        }

        Ok(Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            api_key,
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            broker_servers: DEFAULT_BROKER_SERVERS.to_string(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            subscribe_retry: RetryPolicy::default(),
            decode_errors: DecodeErrorPolicy::default(),
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        })
    }

    /// Full feed URL including the credential
    pub fn feed_url(&self) -> Result<Url, ConnectorError> {
        let mut url = Url::parse(&self.feed_url)
            .map_err(|e| ConnectorError::Config(format!("invalid feed url {}: {}", self.feed_url, e)))?;
        url.query_pairs_mut().append_pair("token", &self.api_key);
        Ok(url)
    }

    /// Feed URL safe for logging
    pub fn redacted_feed_url(&self) -> String {
        format!("{}?token=<redacted>", self.feed_url)
    }
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("feed_url", &self.feed_url)
            .field("api_key", &"<redacted>")
            .field("symbols", &self.symbols)
            .field("broker_servers", &self.broker_servers)
            .field("client_name", &self.client_name)
            .field("topic", &self.topic)
            .field("subscribe_retry", &self.subscribe_retry)
            .field("decode_errors", &self.decode_errors)
            .field("read_timeout", &self.read_timeout)
            .field("publish_timeout", &self.publish_timeout)
            .finish()
    }
}
