use serde_json::{Map, Value};
use thiserror::Error;

/// One decoded JSON object exactly as it arrived on the wire.
pub type Record = Map<String, Value>;

/// Field carrying the numeric reading of a sample.
pub const VALUE_FIELD: &str = "value";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected an array of objects or a single object, got {0}")]
    UnexpectedShape(&'static str),

    #[error("element {index} is {kind}, expected an object")]
    NotAnObject { index: usize, kind: &'static str },

    #[error("element {index} has a non-numeric value ({kind})")]
    NonNumericValue { index: usize, kind: &'static str },
}

/// A record that carries a usable `value`. Every other field rides along
/// untouched and is persisted verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    value: f64,
    record: Record,
}

impl Sample {
    /// Returns `Ok(None)` when `value` is absent or null; those records are
    /// filtered out, not treated as errors.
    pub fn from_record(record: Record) -> Result<Option<Self>, &'static str> {
        let value = match record.get(VALUE_FIELD) {
            None | Some(Value::Null) => return Ok(None),
            Some(v) => v.as_f64().ok_or_else(|| json_kind(v))?,
        };
        Ok(Some(Self { value, record }))
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn channel(&self) -> Option<&str> {
        self.record.get("channel").and_then(Value::as_str)
    }

    pub fn time(&self) -> Option<f64> {
        self.record.get("time").and_then(Value::as_f64)
    }

    /// Single-line JSON rendering of the full record.
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.record)
    }
}

/// Result of decoding one message: the accepted samples in wire order and
/// how many records were dropped for lacking a value.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Batch {
    pub samples: Vec<Sample>,
    pub skipped: usize,
}

/// Decodes a message into samples. Accepts a JSON array of objects or a
/// single object, which is treated as a batch of one.
///
/// The whole message is rejected if any element is malformed, so a bad
/// message never leaves a partial trail in the log.
pub fn decode_batch(text: &str) -> Result<Batch, DecodeError> {
    let records = match serde_json::from_str::<Value>(text)? {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(record) => Ok(record),
                other => Err(DecodeError::NotAnObject { index, kind: json_kind(&other) }),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Value::Object(record) => vec![record],
        other => return Err(DecodeError::UnexpectedShape(json_kind(&other))),
    };

    let mut batch = Batch::default();
    for (index, record) in records.into_iter().enumerate() {
        match Sample::from_record(record) {
            Ok(Some(sample)) => batch.samples.push(sample),
            Ok(None) => batch.skipped += 1,
            Err(kind) => return Err(DecodeError::NonNumericValue { index, kind }),
        }
    }
    Ok(batch)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
