use telegauge_core::decode_batch;
use tracing::{error, trace, warn};

use crate::gauge::SampleDisplay;
use crate::log::RecordLog;

/// Counters for one consumer session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Messages taken off the inbound queue, sentinel excluded.
    pub messages: u64,
    pub persisted: u64,
    /// Records dropped for an absent or null value.
    pub skipped: u64,
    /// Messages thrown away because they did not decode.
    pub discarded: u64,
    pub write_failures: u64,
}

/// Turns raw messages into log lines and gauge updates.
pub struct SampleProcessor {
    log: Box<dyn RecordLog>,
    display: Box<dyn SampleDisplay>,
    stats: SessionStats,
}

impl SampleProcessor {
    pub fn new(log: Box<dyn RecordLog>, display: Box<dyn SampleDisplay>) -> Self {
        Self { log, display, stats: SessionStats::default() }
    }

    /// Decodes `message` and fans every accepted sample out to the log and
    /// the display, in wire order. Never fails: a bad message is logged and
    /// dropped so the caller's loop keeps going.
    pub fn handle(&mut self, message: &str) {
        self.stats.messages += 1;

        let batch = match decode_batch(message) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, "Discarding undecodable message");
                self.stats.discarded += 1;
                return;
            }
        };
        if batch.skipped > 0 {
            trace!(skipped = batch.skipped, "Records without a value");
            self.stats.skipped += batch.skipped as u64;
        }

        for sample in &batch.samples {
            match self.log.append(sample) {
                Ok(()) => self.stats.persisted += 1,
                Err(e) => {
                    error!(error = %e, "Failed to persist sample");
                    self.stats.write_failures += 1;
                }
            }
            if let Err(e) = self.display.render(sample.value()) {
                warn!(error = %e, "Failed to draw gauge");
            }
        }
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use telegauge_core::Sample;

    #[derive(Clone, Default)]
    struct Recorder {
        lines: Arc<Mutex<Vec<String>>>,
        values: Arc<Mutex<Vec<f64>>>,
        fail_writes: bool,
    }

    impl RecordLog for Recorder {
        fn append(&mut self, sample: &Sample) -> io::Result<()> {
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.lines.lock().unwrap().push(sample.to_line()?);
            Ok(())
        }
    }

    impl SampleDisplay for Recorder {
        fn render(&mut self, value: f64) -> io::Result<()> {
            self.values.lock().unwrap().push(value);
            Ok(())
        }
    }

    fn processor(recorder: &Recorder) -> SampleProcessor {
        SampleProcessor::new(Box::new(recorder.clone()), Box::new(recorder.clone()))
    }

    #[test]
    fn null_only_batch_persists_nothing() {
        let recorder = Recorder::default();
        let mut processor = processor(&recorder);
        processor.handle(r#"[{"value": null}]"#);

        assert!(recorder.lines.lock().unwrap().is_empty());
        assert!(recorder.values.lock().unwrap().is_empty());
        assert_eq!(processor.stats().skipped, 1);
    }

    #[test]
    fn mixed_batch_persists_valid_records_in_order() {
        let recorder = Recorder::default();
        let mut processor = processor(&recorder);
        processor.handle(r#"[{"value": 0.5}, {"value": null}, {"value": -0.25}]"#);

        assert_eq!(*recorder.lines.lock().unwrap(), vec![r#"{"value":0.5}"#, r#"{"value":-0.25}"#]);
        assert_eq!(*recorder.values.lock().unwrap(), vec![0.5, -0.25]);
        assert_eq!(
            processor.stats(),
            SessionStats { messages: 1, persisted: 2, skipped: 1, ..Default::default() }
        );
    }

    #[test]
    fn malformed_message_does_not_poison_the_next_one() {
        let recorder = Recorder::default();
        let mut processor = processor(&recorder);
        processor.handle(r#"[{"channel":"sine","value":0.3"#);
        processor.handle("garbage");
        processor.handle(r#"[{"channel":"sine","value":0.75}]"#);

        assert_eq!(*recorder.lines.lock().unwrap(), vec![r#"{"channel":"sine","value":0.75}"#]);
        assert_eq!(processor.stats().discarded, 2);
        assert_eq!(processor.stats().messages, 3);
    }

    #[test]
    fn write_failure_still_draws() {
        let recorder = Recorder { fail_writes: true, ..Default::default() };
        let mut processor = processor(&recorder);
        processor.handle(r#"[{"value": 0.1}]"#);

        assert_eq!(*recorder.values.lock().unwrap(), vec![0.1]);
        assert_eq!(processor.stats().write_failures, 1);
        assert_eq!(processor.stats().persisted, 0);
    }
}
