//! Append-only per-frame record sinks.
//!
//! Every successfully processed frame produces one
//! [`FrameRecord`](crate::types::FrameRecord); sinks receive them in
//! order. Sink failures are logged by the estimator and never abort
//! frame processing.

use crate::error::RppgResult;
use crate::types::FrameRecord;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Receives one record per processed frame, in order.
pub trait RecordSink: Send {
    /// Append a record.
    fn append(&mut self, record: &FrameRecord) -> RppgResult<()>;
}

/// Sink that discards every record.
#[derive(Debug, Default)]
pub struct NullSink;

impl RecordSink for NullSink {
    fn append(&mut self, _record: &FrameRecord) -> RppgResult<()> {
        Ok(())
    }
}

/// In-memory sink, mainly for tests and short sessions.
impl RecordSink for Vec<FrameRecord> {
    fn append(&mut self, record: &FrameRecord) -> RppgResult<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// CSV sink appending `timestamp,output,hr` rows to a file.
///
/// The header is written once when the file is created empty; reopening
/// an existing log appends below the previous session's rows. Rows are
/// flushed per append so a crashed session keeps its records.
pub struct CsvSink {
    writer: BufWriter<std::fs::File>,
}

impl CsvSink {
    /// Open (or create) a log file in append mode.
    pub fn open<P: AsRef<Path>>(path: P) -> RppgResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        let is_new = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);
        if is_new {
            writer.write_all(b"timestamp,output,hr\n")?;
            writer.flush()?;
        }
        Ok(Self { writer })
    }
}

impl RecordSink for CsvSink {
    fn append(&mut self, record: &FrameRecord) -> RppgResult<()> {
        match record.heart_rate {
            Some(hr) => writeln!(
                self.writer,
                "{},{},{}",
                record.timestamp_ms, record.signal, hr
            )?,
            None => writeln!(self.writer, "{},{},", record.timestamp_ms, record.signal)?,
        }
        self.writer.flush()?;
        Ok(())
    }
}
