//! Bar sinks.
//!
//! [`CsvBarSink`] stages rows in `<output>.partial` and only moves the file
//! onto the output path when the run finishes. Dropping an unfinished sink
//! removes the staging file (or leaves it, suffix intact, when configured to
//! keep partial output), so a failed run never leaves a truncated bar file
//! that looks complete.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use streambar_core::config::OutputConfig;
use streambar_core::{Bar, Error, Result};
use tracing::{debug, warn};

/// Suffix of the staging file written next to the output.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Destination for completed bars, written one at a time in order.
pub trait BarSink {
    /// Append one bar.
    fn write_bar(&mut self, bar: &Bar) -> Result<()>;

    /// Number of bars written so far.
    fn bars_written(&self) -> u64;

    /// Flush and release the destination. No bars may be written afterwards.
    fn finish(&mut self) -> Result<()>;
}

impl<K: BarSink + ?Sized> BarSink for &mut K {
    fn write_bar(&mut self, bar: &Bar) -> Result<()> {
        (**self).write_bar(bar)
    }

    fn bars_written(&self) -> u64 {
        (**self).bars_written()
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// CSV bar file with header `volume,buys,vwap,trades`.
pub struct CsvBarSink {
    writer: Option<csv::Writer<File>>,
    /// Final destination.
    path: PathBuf,
    /// Where rows are written until the run finishes.
    staging: PathBuf,
    discard_partial: bool,
    written: u64,
    finished: bool,
}

impl CsvBarSink {
    /// Create the staging file and write the header.
    pub fn create(path: impl AsRef<Path>, config: &OutputConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let staging = staging_path(&path);
        let file = File::create(&staging).map_err(|e| Error::sink(&path, e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .delimiter(config.delimiter as u8)
            .from_writer(file);

        // From here on Drop owns cleanup of the staging file.
        let mut sink = Self {
            writer: None,
            path,
            staging,
            discard_partial: config.discard_partial,
            written: 0,
            finished: false,
        };
        writer
            .write_record(Bar::HEADER)
            .map_err(|e| Error::sink(&sink.path, e.into()))?;
        sink.writer = Some(writer);

        debug!(path = %sink.path.display(), staging = %sink.staging.display(), "opened bar sink");
        Ok(sink)
    }

    pub fn staging_path(&self) -> &Path {
        &self.staging
    }

    fn closed_error(&self) -> Error {
        Error::sink(
            &self.path,
            std::io::Error::new(std::io::ErrorKind::Other, "bar sink already finished"),
        )
    }
}

impl BarSink for CsvBarSink {
    fn write_bar(&mut self, bar: &Bar) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(self.closed_error());
        };
        writer
            .serialize(bar)
            .map_err(|e| Error::sink(&self.path, e.into()))?;
        self.written += 1;
        Ok(())
    }

    fn bars_written(&self) -> u64 {
        self.written
    }

    fn finish(&mut self) -> Result<()> {
        let Some(writer) = self.writer.take() else {
            return Err(self.closed_error());
        };
        let file = writer
            .into_inner()
            .map_err(|e| Error::sink(&self.path, e.into_error()))?;
        file.sync_all().map_err(|e| Error::sink(&self.path, e))?;
        drop(file);

        fs::rename(&self.staging, &self.path).map_err(|e| Error::sink(&self.path, e))?;
        self.finished = true;
        debug!(path = %self.path.display(), bars = self.written, "bar sink finished");
        Ok(())
    }
}

impl Drop for CsvBarSink {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // Flushes whatever is buffered; errors have nowhere to go.
        drop(self.writer.take());
        if self.discard_partial {
            if let Err(e) = fs::remove_file(&self.staging) {
                warn!(staging = %self.staging.display(), error = %e, "failed to remove partial bar file");
            }
        } else {
            warn!(
                staging = %self.staging.display(),
                bars = self.written,
                "run did not complete, partial bar file left in place"
            );
        }
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// In-memory sink, for embedding and tests.
#[derive(Debug, Default)]
pub struct BarCollector {
    bars: Vec<Bar>,
    finished: bool,
}

impl BarCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl BarSink for BarCollector {
    fn write_bar(&mut self, bar: &Bar) -> Result<()> {
        if self.finished {
            return Err(Error::internal("bar written after collector finished"));
        }
        self.bars.push(bar.clone());
        Ok(())
    }

    fn bars_written(&self) -> u64 {
        self.bars.len() as u64
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
