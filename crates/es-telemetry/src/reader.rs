//! Partition readers.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use arrow::error::ArrowError;
use es_common::{schema::is_compatible, Reading, SCHEMA_VERSION};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::errors::ParquetError;
use thiserror::Error;
use tracing::warn;

use crate::partition::FILE_EXTENSION;
use crate::schema::batch_to_readings;
use crate::SCHEMA_VERSION_KEY;

/// Errors from reading telemetry files.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Parquet error in {path}: {source}")]
    Parquet {
        path: PathBuf,
        #[source]
        source: ParquetError,
    },

    #[error("Arrow error in {path}: {source}")]
    Arrow {
        path: PathBuf,
        #[source]
        source: ArrowError,
    },
}

/// Committed telemetry files in `dir`, sorted by name.
///
/// Hidden entries (including in-flight temp files) are skipped. A missing
/// directory is an empty partition.
pub fn list_partition_files(dir: &Path) -> Result<Vec<PathBuf>, ReadError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ReadError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ReadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        let is_data = path.extension().is_some_and(|ext| ext == FILE_EXTENSION);
        if !hidden && is_data && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn open_builder(path: &Path) -> Result<ParquetRecordBatchReaderBuilder<File>, ReadError> {
    let file = File::open(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ParquetRecordBatchReaderBuilder::try_new(file).map_err(|source| ReadError::Parquet {
        path: path.to_path_buf(),
        source,
    })
}

/// Row count from the file footer, without decoding any data page.
pub fn count_rows(path: &Path) -> Result<u64, ReadError> {
    let builder = open_builder(path)?;
    let rows = builder.metadata().file_metadata().num_rows();
    Ok(u64::try_from(rows).unwrap_or(0))
}

/// Decode every reading in a file.
pub fn read_readings(path: &Path) -> Result<Vec<Reading>, ReadError> {
    let builder = open_builder(path)?;
    check_schema_version(path, &builder);

    let reader = builder.build().map_err(|source| ReadError::Parquet {
        path: path.to_path_buf(),
        source,
    })?;

    let mut readings = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|source| ReadError::Arrow {
            path: path.to_path_buf(),
            source,
        })?;
        let decoded = batch_to_readings(&batch).map_err(|source| ReadError::Arrow {
            path: path.to_path_buf(),
            source,
        })?;
        readings.extend(decoded);
    }
    Ok(readings)
}

fn check_schema_version(path: &Path, builder: &ParquetRecordBatchReaderBuilder<File>) {
    let version = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .and_then(|kvs| kvs.iter().find(|kv| kv.key == SCHEMA_VERSION_KEY))
        .and_then(|kv| kv.value.clone());

    match version {
        Some(v) if is_compatible(&v) => {}
        Some(v) => warn!(
            path = %path.display(),
            file_version = %v,
            expected = SCHEMA_VERSION,
            "incompatible schema version, decoding anyway"
        ),
        None => warn!(path = %path.display(), "file has no schema version"),
    }
}
