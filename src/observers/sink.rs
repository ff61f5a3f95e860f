//! Buffered CSV emission shared by the analysis observers.

use crate::error::Result;
use crate::world::{Tick, World};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Rows buffered before an automatic flush.
pub const FLUSH_ROWS: usize = 10_000;

/// A CSV file with an in-memory row buffer. The header is written at
/// creation (fatal on failure); rows accumulate until [`flush`](CsvSink::flush).
pub struct CsvSink {
    writer: BufWriter<File>,
    path: PathBuf,
    rows: Vec<Vec<f32>>,
}

impl CsvSink {
    pub fn create(path: PathBuf, header: &str) -> Result<Self> {
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{header}")?;
        Ok(CsvSink {
            writer,
            path,
            rows: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn push(&mut self, row: Vec<f32>) {
        self.rows.push(row);
    }

    pub fn buffered(&self) -> usize {
        self.rows.len()
    }

    /// Writes and clears the buffered rows.
    pub fn flush(&mut self) -> std::io::Result<()> {
        for row in self.rows.drain(..) {
            let mut first = true;
            for v in row {
                if !first {
                    self.writer.write_all(b",")?;
                }
                write!(self.writer, "{v}")?;
                first = false;
            }
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()
    }
}

/// Sampling cadence of an analysis observer: the first sample falls one
/// period in, then one sample every period.
pub struct SampleClock {
    freq: Tick,
    next: Tick,
}

impl SampleClock {
    /// `freq_sec` is clamped to at least one tick.
    pub fn new(freq_sec: f32, world: World) -> Self {
        let freq = world.to_ticks(freq_sec as f64).max(1);
        SampleClock { freq, next: freq }
    }

    pub fn due(&mut self, tick: Tick) -> bool {
        if tick >= self.next {
            self.next = tick + self.freq;
            return true;
        }
        false
    }
}
