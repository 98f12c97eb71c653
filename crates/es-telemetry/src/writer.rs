//! Partitioned Parquet writer.
//!
//! One call writes one closed window to its partition. Files are committed
//! by writing a hidden temp sibling, syncing it, and renaming it over the
//! final name, so a reader never observes a partially written file.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use es_common::{Reading, StationId, SCHEMA_VERSION};
use es_config::{Codec, FilenameScheme, WriterSettings};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use thiserror::Error;
use tracing::{debug, info};

use crate::partition::PartitionKey;
use crate::schema::readings_to_batch;
use crate::{SCHEMA_VERSION_KEY, STATION_ID_KEY};

/// Errors from writing telemetry files.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),
}

impl WriteError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        WriteError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Root of the partition tree.
    pub root: PathBuf,
    pub compression: Codec,
    /// Maximum rows per Parquet row group.
    pub row_group_size: usize,
    /// Already resolved against the batch duration (never `Auto`).
    pub filename_scheme: FilenameScheme,
}

impl WriterConfig {
    /// Snappy, 64Ki-row groups, minute file names.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            compression: Codec::Snappy,
            row_group_size: 65_536,
            filename_scheme: FilenameScheme::Minute,
        }
    }

    /// Build from the `[writer]` section, resolving the file name scheme.
    pub fn from_settings(
        root: impl Into<PathBuf>,
        settings: &WriterSettings,
        batch_duration_secs: u64,
    ) -> Self {
        Self {
            root: root.into(),
            compression: settings.compression,
            row_group_size: settings.row_group_size,
            filename_scheme: settings.filename_scheme.resolve(batch_duration_secs),
        }
    }

    pub fn with_compression(mut self, compression: Codec) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_filename_scheme(mut self, scheme: FilenameScheme) -> Self {
        self.filename_scheme = scheme;
        self
    }
}

/// Writes closed windows into the partition tree.
#[derive(Debug, Clone)]
pub struct PartitionedWriter {
    config: WriterConfig,
}

impl PartitionedWriter {
    pub fn new(config: WriterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Key for the window closing at `boundary`.
    pub fn partition_key(&self, boundary: DateTime<Utc>, station: &StationId) -> PartitionKey {
        PartitionKey::derive(boundary, station, self.config.filename_scheme)
    }

    /// Create the partition directory tree. A no-op when it already exists.
    pub fn ensure_partition_dir(&self, key: &PartitionKey) -> Result<PathBuf, WriteError> {
        let dir = self.config.root.join(key.relative_dir());
        fs::create_dir_all(&dir).map_err(|e| WriteError::io(&dir, e))?;
        Ok(dir)
    }

    /// Serialize one window and commit it under its partition path.
    ///
    /// Returns the committed path. Writing the same window twice replaces
    /// the earlier file atomically.
    pub fn write(
        &self,
        readings: &[Reading],
        boundary: DateTime<Utc>,
        station: &StationId,
    ) -> Result<PathBuf, WriteError> {
        let key = self.partition_key(boundary, station);
        let dir = self.ensure_partition_dir(&key)?;
        let path = dir.join(&key.filename);

        let batch = readings_to_batch(readings)?;
        let props = writer_properties(self.config.compression, self.config.row_group_size, station);
        commit_parquet(&path, &batch, props)?;

        info!(
            path = %path.display(),
            rows = readings.len(),
            boundary = %boundary,
            "window committed"
        );
        Ok(path)
    }
}

/// Map a configured codec to the Parquet compression setting.
pub fn parquet_compression(codec: Codec) -> Compression {
    match codec {
        Codec::Snappy => Compression::SNAPPY,
        Codec::Zstd => Compression::ZSTD(ZstdLevel::default()),
        Codec::Uncompressed => Compression::UNCOMPRESSED,
    }
}

/// Writer properties shared by raw windows and archives.
pub fn writer_properties(
    codec: Codec,
    row_group_size: usize,
    station: &StationId,
) -> WriterProperties {
    WriterProperties::builder()
        .set_compression(parquet_compression(codec))
        .set_max_row_group_size(row_group_size.max(1))
        .set_key_value_metadata(Some(vec![
            KeyValue::new(SCHEMA_VERSION_KEY.to_string(), SCHEMA_VERSION.to_string()),
            KeyValue::new(STATION_ID_KEY.to_string(), station.to_string()),
        ]))
        .build()
}

/// Write `batch` to `path` through a synced temp file and an atomic rename.
///
/// The parent directory must exist. On failure the temp file is removed and
/// any earlier file at `path` is left untouched.
pub fn commit_parquet(
    path: &Path,
    batch: &RecordBatch,
    props: WriterProperties,
) -> Result<(), WriteError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = dir.join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()));

    if let Err(e) = write_synced(&tmp_path, batch, props) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(WriteError::io(path, e));
    }

    sync_dir(dir);
    Ok(())
}

fn write_synced(
    tmp_path: &Path,
    batch: &RecordBatch,
    props: WriterProperties,
) -> Result<(), WriteError> {
    let file = File::create(tmp_path).map_err(|e| WriteError::io(tmp_path, e))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;

    File::open(tmp_path)
        .and_then(|f| f.sync_all())
        .map_err(|e| WriteError::io(tmp_path, e))
}

/// Persist the rename itself. Best effort: not every platform can sync a directory.
fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        debug!(dir = %dir.display(), error = %e, "directory sync skipped");
    }
}
