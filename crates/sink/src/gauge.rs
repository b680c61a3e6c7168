//! Single-line console gauge showing where the latest sample sits.

use std::io::{self, Stdout, Write};

use tracing::warn;

pub const DEFAULT_SCALE: usize = 50;
/// Widest supported half-line; keeps `2 * scale` and the `i64` math exact.
pub const MAX_SCALE: usize = 2048;
pub const BACKGROUND: char = '_';
pub const MARKER: char = 'O';

/// Sink for the value of every accepted sample.
pub trait SampleDisplay: Send {
    fn render(&mut self, value: f64) -> io::Result<()>;
}

/// Fixed-width line of `2 * scale` cells. A value maps to
/// `round(value * scale) + scale`, so `[-1, 1]` spans the whole line.
/// Positions past either end are pinned to the edge cell.
#[derive(Debug, Clone)]
pub struct Gauge {
    scale: usize,
    line: String,
}

impl Gauge {
    pub fn new(scale: usize) -> Self {
        let scale = scale.clamp(1, MAX_SCALE);
        Self { scale, line: BACKGROUND.to_string().repeat(2 * scale) }
    }

    pub fn width(&self) -> usize {
        2 * self.scale
    }

    /// Unclamped cell for `value`; may fall outside the line.
    pub fn position(&self, value: f64) -> i64 {
        let scale = self.scale as i64;
        ((value * self.scale as f64).round() as i64).saturating_add(scale)
    }

    /// Cell the marker is drawn in, or `None` for NaN and infinities.
    pub fn index(&self, value: f64) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }
        let last = self.width() as i64 - 1;
        Some(self.position(value).clamp(0, last) as usize)
    }

    /// Redraws the line for `value` and returns it. Non-finite values leave
    /// the previous line untouched.
    pub fn update(&mut self, value: f64) -> Option<&str> {
        let marker = self.index(value)?;
        let width = self.width();
        self.line.clear();
        self.line
            .extend((0..width).map(|cell| if cell == marker { MARKER } else { BACKGROUND }));
        Some(self.line.as_str())
    }

    pub fn line(&self) -> &str {
        &self.line
    }
}

/// [`Gauge`] drawn in place on a terminal-like writer.
pub struct ConsoleGauge<W> {
    gauge: Gauge,
    out: W,
}

impl ConsoleGauge<Stdout> {
    pub fn stdout(scale: usize) -> Self {
        Self::new(scale, io::stdout())
    }
}

impl<W: Write + Send> ConsoleGauge<W> {
    pub fn new(scale: usize, out: W) -> Self {
        Self { gauge: Gauge::new(scale), out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> SampleDisplay for ConsoleGauge<W> {
    fn render(&mut self, value: f64) -> io::Result<()> {
        match self.gauge.update(value) {
            Some(line) => {
                write!(self.out, "\r{line}")?;
                self.out.flush()
            }
            None => {
                warn!(value, "Sample value is not finite; gauge not updated");
                Ok(())
            }
        }
    }
}
