use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("websocket error: {0}")]
    Transport(#[from] tungstenite::Error),
    #[error("disconnected: {0}")]
    Disconnected(String),
    #[error("no frame received within {0:?}")]
    ReadTimeout(Duration),
    #[error("subscription failed for symbols: {}", .0.join(", "))]
    SubscriptionFailed(Vec<String>),
    #[error("failed to decode frame: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

impl ConnectorError {
    /// Failures of the feed connection itself, as opposed to bad input or
    /// configuration. Only these are worth retrying on an open connection.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Disconnected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(ConnectorError::Transport(tungstenite::Error::ConnectionClosed).is_transport());
        assert!(ConnectorError::Disconnected("close frame".into()).is_transport());
        assert!(!ConnectorError::Config("missing".into()).is_transport());
        assert!(!ConnectorError::ReadTimeout(Duration::from_secs(1)).is_transport());
    }

    #[test]
    fn test_subscription_failed_display() {
        let err = ConnectorError::SubscriptionFailed(vec![
            "BINANCE:BTCUSDT".to_string(),
            "BINANCE:ETHUSDT".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "subscription failed for symbols: BINANCE:BTCUSDT, BINANCE:ETHUSDT"
        );
    }
}
