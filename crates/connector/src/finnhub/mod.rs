//! Finnhub upstream feed
//!
//! WebSocket connectivity, symbol subscription and frame decoding for the
//! Finnhub trade stream.

pub mod messages;
pub mod subscription;
pub mod websocket;

pub use messages::{InboundFrame, SubscribeRequest, TRADE_FRAME_TYPE};
pub use subscription::{subscribe, subscribe_all};
pub use websocket::{for_each_frame, FeedConnection, FeedSink, FrameStream};
