//! pricefeed-middleware: Broker transport abstractions
//!
//! Provides the `Transport` trait used to republish records, a NATS-backed
//! implementation and an in-memory implementation for testing.

pub mod error;
pub mod memory;
pub mod nats;
pub mod transport;

pub use error::TransportError;
pub use memory::InMemoryTransport;
pub use nats::{NatsConfig, NatsTransport};
pub use transport::{Subscription, Transport, TransportMessage};
