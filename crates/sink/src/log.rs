use std::fs::{File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};

use telegauge_core::Sample;
use tracing::info;

/// Append-only destination for accepted samples.
pub trait RecordLog: Send {
    fn append(&mut self, sample: &Sample) -> io::Result<()>;
}

/// One JSON object per line, appended to a file that is never truncated.
pub struct FileLog {
    path: PathBuf,
    writer: LineWriter<File>,
}

impl FileLog {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!(path = %path.display(), "Appending samples to log");
        Ok(Self { path, writer: LineWriter::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordLog for FileLog {
    fn append(&mut self, sample: &Sample) -> io::Result<()> {
        let line = sample.to_line()?;
        // LineWriter flushes on the newline.
        writeln!(self.writer, "{line}")
    }
}
