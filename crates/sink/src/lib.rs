pub mod config;
pub mod consumer;
pub mod error;
pub mod gauge;
pub mod log;
pub mod processor;

pub use config::SinkConfig;
pub use consumer::SampleConsumer;
pub use error::{ConfigError, ConsumerError};
pub use gauge::{ConsoleGauge, Gauge, SampleDisplay};
pub use log::{FileLog, RecordLog};
pub use processor::{SampleProcessor, SessionStats};
