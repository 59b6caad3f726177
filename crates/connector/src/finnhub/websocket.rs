//! Finnhub WebSocket connection
//!
//! Owns the duplex connection to the upstream feed. The write half is shared
//! (`FeedSink`) so every symbol can subscribe concurrently; the read half is
//! driven by `for_each_frame`, which never reads ahead of its handler.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{info, trace, warn};
use url::Url;

use crate::error::ConnectorError;
use crate::traits::FrameSink;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Read half of the feed connection
pub type FrameStream = SplitStream<WsStream>;

/// An open connection to the feed
pub struct FeedConnection {
    ws: WsStream,
}

impl FeedConnection {
    /// Perform the WebSocket handshake. No retry: a failed handshake is fatal.
    ///
    /// `log_url` is what gets logged in place of `url`, which carries the
    /// credential.
    pub async fn connect(url: &Url, log_url: &str) -> Result<Self, ConnectorError> {
        info!(url = %log_url, "Connecting to feed WebSocket");

        let (ws, response) = connect_async(url.as_str())
            .await
            .map_err(|e| ConnectorError::ConnectionFailed(e.to_string()))?;

        info!(status = ?response.status(), "Feed WebSocket connected");

        Ok(Self { ws })
    }

    /// Split into a shareable writer and the frame stream
    pub fn split(self) -> (FeedSink, FrameStream) {
        let (write, read) = self.ws.split();
        (FeedSink::new(write), read)
    }
}

/// Shared write half of the feed connection
#[derive(Clone)]
pub struct FeedSink {
    inner: Arc<Mutex<SplitSink<WsStream, Message>>>,
}

impl FeedSink {
    fn new(sink: SplitSink<WsStream, Message>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sink)),
        }
    }

    /// Send a close frame and flush
    pub async fn close(&self) -> Result<(), ConnectorError> {
        self.inner.lock().await.close().await?;
        Ok(())
    }
}

#[async_trait]
impl FrameSink for FeedSink {
    async fn send_text(&self, text: String) -> Result<(), ConnectorError> {
        self.inner.lock().await.send(Message::Text(text)).await?;
        Ok(())
    }
}

/// Feed every text frame to `handler`, one at a time.
///
/// The next frame is only read once `handler` has finished with the previous
/// one. Returns `Ok(())` only when `shutdown` flips to `true`; a close frame,
/// end of stream, read timeout, transport error or handler error all end the
/// loop with `Err`.
pub async fn for_each_frame<S, H, Fut>(
    mut frames: S,
    read_timeout: Option<Duration>,
    mut shutdown: watch::Receiver<bool>,
    mut handler: H,
) -> Result<(), ConnectorError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    H: FnMut(String) -> Fut,
    Fut: Future<Output = Result<(), ConnectorError>>,
{
    let mut shutdown_open = true;

    loop {
        if *shutdown.borrow() {
            info!("Shutdown requested, leaving receive loop");
            return Ok(());
        }

        let msg = tokio::select! {
            changed = shutdown.changed(), if shutdown_open => {
                // Sender gone: nobody can request shutdown any more
                if changed.is_err() {
                    shutdown_open = false;
                }
                continue;
            }
            msg = next_frame(&mut frames, read_timeout) => msg?,
        };

        match msg {
            Message::Text(text) => handler(text).await?,
            Message::Binary(data) => match String::from_utf8(data) {
                Ok(text) => handler(text).await?,
                Err(e) => warn!(error = %e, "Dropping non-UTF-8 binary frame"),
            },
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                trace!("Control frame received");
            }
            Message::Close(frame) => {
                info!(frame = ?frame, "Feed WebSocket closed by peer");
                return Err(ConnectorError::Disconnected(format!(
                    "closed by peer: {:?}",
                    frame
                )));
            }
        }
    }
}

async fn next_frame<S>(frames: &mut S, read_timeout: Option<Duration>) -> Result<Message, ConnectorError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let next = match read_timeout {
        Some(timeout) => tokio::time::timeout(timeout, frames.next())
            .await
            .map_err(|_| {
                warn!(timeout_secs = timeout.as_secs(), "Feed WebSocket read timeout");
                ConnectorError::ReadTimeout(timeout)
            })?,
        None => frames.next().await,
    };

    match next {
        Some(Ok(msg)) => Ok(msg),
        Some(Err(e)) => Err(e.into()),
        None => Err(ConnectorError::Disconnected("stream ended".to_string())),
    }
}
