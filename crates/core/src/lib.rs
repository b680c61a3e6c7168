pub mod sample;
pub mod log;

pub use sample::{decode_batch, Batch, DecodeError, Record, Sample, VALUE_FIELD};
pub use log::{read_log, LogReadError};
