use thiserror::Error;

use telegauge_stream::StreamError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    Endpoint { endpoint: String, reason: String },

    #[error("gauge scale must be between 1 and {}", crate::gauge::MAX_SCALE)]
    GaugeScale,

    #[error("poll timeout must be greater than zero")]
    PollTimeout,
}

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("sample consumer is already running")]
    AlreadyStarted,

    #[error("sample consumer already ran its session")]
    Spent,

    #[error("failed to spawn consumer thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error(transparent)]
    Stream(#[from] StreamError),
}
