//! Persistence of export records.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::record::ExportRecord;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to create output directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Receiver of one finished record per gesture.
///
/// Shared across worker threads when a batch runs in parallel.
pub trait RecordWriter: Sync {
    /// Persist `record`, returning where it went.
    fn write(&self, record: &ExportRecord) -> Result<PathBuf, WriteError>;
}

/// Writes each record as pretty JSON to `<output_dir>/<gesture lowercase>.json`
#[derive(Debug, Clone)]
pub struct JsonRecordWriter {
    output_dir: PathBuf,
}

impl JsonRecordWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn path_for(&self, gesture: &str) -> PathBuf {
        self.output_dir.join(format!("{}.json", gesture.to_lowercase()))
    }
}

impl RecordWriter for JsonRecordWriter {
    fn write(&self, record: &ExportRecord) -> Result<PathBuf, WriteError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| WriteError::CreateDir {
            path: self.output_dir.clone(),
            source,
        })?;

        let path = self.path_for(&record.name);
        record.save_to_file(&path).map_err(|source| WriteError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }
}
