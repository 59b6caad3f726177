//! Symbol subscription over an open feed connection
//!
//! One `{"type":"subscribe","symbol":...}` frame per symbol. Transport
//! failures are retried per `RetryPolicy`; all symbols are subscribed
//! concurrently and every one runs to completion before the result is known.

use futures_util::future::join_all;
use tracing::{error, info};

use crate::error::ConnectorError;
use crate::finnhub::messages::SubscribeRequest;
use crate::metrics::BridgeMetrics;
use crate::retry::{retry, Exhausted, RetryPolicy};
use crate::traits::FrameSink;

/// Subscribe to one symbol, retrying transport failures.
pub async fn subscribe<S>(
    sink: &S,
    symbol: &str,
    policy: &RetryPolicy,
    metrics: &BridgeMetrics,
) -> Result<(), Exhausted<ConnectorError>>
where
    S: FrameSink + ?Sized,
{
    let request = SubscribeRequest::new(symbol)
        .to_json()
        .map_err(|e| Exhausted {
            attempts: 0,
            last_error: ConnectorError::from(e),
        })?;

    retry(
        policy,
        |attempt| {
            let request = request.clone();
            async move {
                info!(symbol = %symbol, attempt, "Subscribing to symbol");
                let result = sink.send_text(request).await;
                metrics.inc_subscription_attempt(symbol, result.is_ok());
                result
            }
        },
        ConnectorError::is_transport,
    )
    .await?;

    info!(symbol = %symbol, "Subscribed to symbol");
    Ok(())
}

/// Subscribe to every symbol concurrently.
///
/// A failing symbol never cancels the others. Once all have finished, any
/// failures are reported together as `ConnectorError::SubscriptionFailed`.
pub async fn subscribe_all<S>(
    sink: &S,
    symbols: &[String],
    policy: &RetryPolicy,
    metrics: &BridgeMetrics,
) -> Result<(), ConnectorError>
where
    S: FrameSink + ?Sized,
{
    let results = join_all(
        symbols
            .iter()
            .map(|symbol| subscribe(sink, symbol, policy, metrics)),
    )
    .await;

    let mut failed = Vec::new();
    for (symbol, result) in symbols.iter().zip(results) {
        if let Err(e) = result {
            error!(
                symbol = %symbol,
                attempts = e.attempts,
                error = %e.last_error,
                "Failed to subscribe to symbol"
            );
            failed.push(symbol.clone());
        }
    }

    if failed.is_empty() {
        info!(count = symbols.len(), "All symbols subscribed");
        Ok(())
    } else {
        Err(ConnectorError::SubscriptionFailed(failed))
    }
}
