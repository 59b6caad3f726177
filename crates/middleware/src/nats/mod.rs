mod transport;

pub use transport::{NatsConfig, NatsTransport};
