pub mod error;
pub mod queue;
pub mod transport;
pub mod websocket;
pub mod producer;

pub use error::{StreamError, TransportError};
pub use queue::{BlockingQueue, ThreadSafeQueue};
pub use transport::{ConnectionState, Transport};
pub use websocket::WebSocketTransport;
pub use producer::{ProducerConfig, StreamMessage, StreamProducer};
