use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SessionError};
use crate::record::ResultRecord;

/// Receiver of decoded result records.
pub trait RecordSink {
    /// Prepare for records. Called once the meter is ready to transfer,
    /// never when the meter was not read.
    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    /// Take one result record. Called once per result frame.
    fn emit(&mut self, record: &ResultRecord) -> Result<()>;

    /// Flush and close. Called once after the final frame.
    fn finish(&mut self) -> Result<()>;
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn begin(&mut self) -> Result<()> {
        (**self).begin()
    }

    fn emit(&mut self, record: &ResultRecord) -> Result<()> {
        (**self).emit(record)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Collects records in memory.
impl RecordSink for Vec<ResultRecord> {
    fn emit(&mut self, record: &ResultRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Feeds both sinks, first `A` then `B`.
impl<A: RecordSink, B: RecordSink> RecordSink for (A, B) {
    fn begin(&mut self) -> Result<()> {
        self.0.begin()?;
        self.1.begin()
    }

    fn emit(&mut self, record: &ResultRecord) -> Result<()> {
        self.0.emit(record)?;
        self.1.emit(record)
    }

    fn finish(&mut self) -> Result<()> {
        self.0.finish()?;
        self.1.finish()
    }
}

/// One log line per result record.
pub fn format_record(record: &ResultRecord) -> String {
    format!(
        "{}  {:>3} {:<5}  {}  {:<8}  R  {:>4}",
        record.timestamp, record.value, record.unit, record.flags, record.test, record.number
    )
}

/// Line-oriented log file. An empty path means screen-only output.
///
/// The file is created (or truncated) by [`RecordSink::begin`], so a run that
/// never reaches the transfer leaves an existing file untouched.
#[derive(Debug)]
pub struct LogFile {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    written: usize,
}

impl LogFile {
    /// Log to `path` once the transfer begins.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            written: 0,
        }
    }

    /// A sink that discards records.
    pub fn screen_only() -> Self {
        Self::new(PathBuf::new())
    }

    pub fn is_screen_only(&self) -> bool {
        self.path.as_os_str().is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    fn output_error(&self, source: std::io::Error) -> SessionError {
        SessionError::Output {
            path: self.path.clone(),
            source,
        }
    }
}

impl RecordSink for LogFile {
    fn begin(&mut self) -> Result<()> {
        if self.is_screen_only() || self.writer.is_some() {
            return Ok(());
        }
        let file = File::create(&self.path).map_err(|err| self.output_error(err))?;
        debug!(path = ?self.path, "log file opened");
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn emit(&mut self, record: &ResultRecord) -> Result<()> {
        self.begin()?;
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        if let Err(err) = writeln!(writer, "{}", format_record(record)) {
            return Err(self.output_error(err));
        }
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer.flush().map_err(|err| self.output_error(err))?;
        debug!(path = ?self.path, lines = self.written, "log file closed");
        Ok(())
    }
}
