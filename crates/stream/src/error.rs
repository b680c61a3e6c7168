use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("socket I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket protocol error: {0}")]
    Protocol(#[from] tungstenite::Error),

    #[error("connection is closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("stream producer is already running")]
    AlreadyStarted,

    #[error("transport was consumed by a previous session")]
    TransportConsumed,

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}
