//! pricefeed-connector: trade feed to broker bridge
//!
//! Subscribes to Finnhub trade streams and publishes every trade record to
//! the broker, one message per record.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pricefeed_connector_lib::config::API_KEY_ENV;
use pricefeed_connector_lib::{
    Bridge, BridgeConfig, DecodeErrorPolicy, RetryPolicy, ServerState,
};
use pricefeed_middleware::{NatsConfig, NatsTransport, Transport};

const FEED_NAME: &str = "finnhub";

#[derive(Parser, Debug)]
#[command(name = "pricefeed-connector")]
#[command(about = "Bridges Finnhub trades to the crypto-prices broker topic")]
struct Args {
    /// Finnhub API token
    #[arg(long, env = "FINNHUB_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Symbols to subscribe to (comma-separated)
    #[arg(long, env = "FEED_SYMBOLS", value_delimiter = ',')]
    symbols: Option<Vec<String>>,

    /// Feed WebSocket base URL
    #[arg(long, env = "FEED_URL")]
    feed_url: Option<String>,

    /// Broker servers (comma-separated host:port)
    #[arg(long, env = "BROKER_SERVERS")]
    broker_servers: Option<String>,

    /// Broker topic for trade records
    #[arg(long, env = "BROKER_TOPIC")]
    topic: Option<String>,

    /// Health server bind address
    #[arg(long, default_value = "0.0.0.0:8080")]
    health_addr: String,

    /// Wait a fixed 5s between subscribe attempts instead of 5-7s
    #[arg(long)]
    fixed_backoff: bool,

    /// Stop on the first undecodable frame instead of skipping it
    #[arg(long)]
    abort_on_decode_error: bool,
}

impl Args {
    fn into_config(self) -> Result<BridgeConfig, Box<dyn std::error::Error>> {
        let mut config = BridgeConfig::new(self.api_key.unwrap_or_default())?;

        if let Some(symbols) = self.symbols {
            let symbols: Vec<String> = symbols
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !symbols.is_empty() {
                config.symbols = symbols;
            }
        }
        if let Some(feed_url) = self.feed_url {
            config.feed_url = feed_url;
        }
        if let Some(servers) = self.broker_servers {
            config.broker_servers = servers;
        }
        if let Some(topic) = self.topic {
            config.topic = topic;
        }
        if self.fixed_backoff {
            config.subscribe_retry = RetryPolicy::fixed();
        }
        if self.abort_on_decode_error {
            config.decode_errors = DecodeErrorPolicy::Abort;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let health_addr: SocketAddr = args.health_addr.parse()?;

    let config = args.into_config().map_err(|e| {
        error!(error = %e, env = API_KEY_ENV, "Invalid configuration, not connecting");
        e
    })?;
    info!(config = ?config, "Loaded configuration");

    // Setup shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx.send(true).ok();
    });

    // One producer for the whole process
    let nats_config = NatsConfig::new(config.broker_servers.clone(), config.client_name.clone())
        .with_flush_timeout(config.publish_timeout);
    let transport: Arc<dyn Transport> = Arc::new(
        NatsTransport::connect(&nats_config).await.map_err(|e| {
            error!(error = %e, servers = %config.broker_servers, "Failed to connect to broker");
            e
        })?,
    );
    info!(servers = %config.broker_servers, client = %config.client_name, "Connected to broker");

    let bridge = Bridge::new(FEED_NAME, config, transport);

    let server_state = ServerState::new(FEED_NAME, bridge.connected_handle());
    tokio::spawn(async move {
        if let Err(e) = pricefeed_connector_lib::run_server(health_addr, server_state).await {
            error!(error = %e, "Health server error");
        }
    });
    info!(addr = %health_addr, "Health server started");

    bridge.run(shutdown_rx).await.map_err(|e| {
        error!(error = %e, "Bridge failed - exiting");
        e
    })?;

    info!("Bridge shut down cleanly");
    Ok(())
}
