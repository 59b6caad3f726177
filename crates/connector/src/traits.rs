use async_trait::async_trait;

use crate::error::ConnectorError;

/// Write half of the feed connection.
///
/// Takes `&self` so that several subscription tasks can write through one
/// shared handle at the same time.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Send one text frame
    async fn send_text(&self, text: String) -> Result<(), ConnectorError>;
}
