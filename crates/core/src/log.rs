//! Reading back a persisted sample log (one JSON object per line).

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::sample::Record;

#[derive(Debug, Error)]
pub enum LogReadError {
    #[error("failed to read sample log: {0}")]
    Io(#[from] io::Error),

    #[error("line {line} is not a JSON object: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Parses every record of a sample log in file order.
///
/// A trailing line without a newline that fails to parse is a write cut short
/// by a crash or a concurrent writer and is ignored. Any other bad line is an
/// error.
pub fn read_log(path: impl AsRef<Path>) -> Result<Vec<Record>, LogReadError> {
    let content = fs::read_to_string(path)?;
    let complete = content.ends_with('\n');
    let lines: Vec<&str> = content.lines().collect();

    let mut records = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(line) {
            Ok(record) => records.push(record),
            Err(_) if !complete && idx + 1 == lines.len() => break,
            Err(source) => return Err(LogReadError::Parse { line: idx + 1, source }),
        }
    }
    Ok(records)
}
