//! Destinations for batch records.

use std::fs;
use std::path::{Path, PathBuf};

use super::BatchRecord;
use crate::error::Result;
use crate::render::{to_json, JsonFormat};

/// Receives each record as soon as the collector has it.
///
/// A sink error is logged and does not stop the batch.
pub trait RecordSink {
    fn accept(&mut self, record: &BatchRecord) -> Result<()>;
}

impl<F> RecordSink for F
where
    F: FnMut(&BatchRecord) -> Result<()>,
{
    fn accept(&mut self, record: &BatchRecord) -> Result<()> {
        self(record)
    }
}

/// Discards records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RecordSink for NullSink {
    fn accept(&mut self, _record: &BatchRecord) -> Result<()> {
        Ok(())
    }
}

/// Writes one JSON file per record into a directory.
///
/// Files are named `<category>_<stem>.json`, or `<stem>.json` for inputs
/// without a category. Two inputs mapping to the same name overwrite each
/// other.
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    dir: PathBuf,
    format: JsonFormat,
}

impl JsonDirSink {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            format: JsonFormat::Pretty,
        })
    }

    pub fn with_format(mut self, format: JsonFormat) -> Self {
        self.format = format;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where a record is written.
    pub fn path_for(&self, record: &BatchRecord) -> PathBuf {
        self.dir.join(record.output_name())
    }
}

impl RecordSink for JsonDirSink {
    fn accept(&mut self, record: &BatchRecord) -> Result<()> {
        let path = self.path_for(record);
        fs::write(&path, to_json(record, self.format)?)?;
        log::debug!("saved {}", path.display());
        Ok(())
    }
}
