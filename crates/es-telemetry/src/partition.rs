//! Path layout and partitioning helpers.
//!
//! ```text
//! <root>/station=<id>/year=<YYYY>/month=<MM>/day=<DD>/<filename>
//! ```
//!
//! The partition is taken from the window boundary (the instant the window
//! closed), so a window ending at midnight lands in the new day as `data_0000`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use es_common::StationId;
use es_config::FilenameScheme;

/// Extension of every telemetry file.
pub const FILE_EXTENSION: &str = "parquet";

/// Fully derived location of one window's file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    pub station: StationId,
    pub date: NaiveDate,
    pub filename: String,
}

impl PartitionKey {
    /// Derive the key for a window closing at `boundary`.
    pub fn derive(boundary: DateTime<Utc>, station: &StationId, scheme: FilenameScheme) -> Self {
        let stem = match scheme {
            FilenameScheme::Auto | FilenameScheme::Minute => {
                format!("data_{}", boundary.format("%H%M"))
            }
            FilenameScheme::Hour => format!("data_{}", boundary.format("%H")),
            FilenameScheme::Day => "data".to_string(),
        };
        Self {
            station: station.clone(),
            date: boundary.date_naive(),
            filename: format!("{stem}.{FILE_EXTENSION}"),
        }
    }

    /// Directory of this key, relative to the output root.
    pub fn relative_dir(&self) -> PathBuf {
        day_partition_dir(Path::new(""), &self.station, self.date)
    }

    /// File path of this key, relative to the output root.
    pub fn relative_path(&self) -> PathBuf {
        self.relative_dir().join(&self.filename)
    }
}

/// `station=<id>/year=<YYYY>/month=<MM>` under `root`.
pub fn month_partition_dir(root: &Path, station: &StationId, date: NaiveDate) -> PathBuf {
    root.join(format!("station={station}"))
        .join(format!("year={:04}", date.year()))
        .join(format!("month={:02}", date.month()))
}

/// `station=<id>/year=<YYYY>/month=<MM>/day=<DD>` under `root`.
pub fn day_partition_dir(root: &Path, station: &StationId, date: NaiveDate) -> PathBuf {
    month_partition_dir(root, station, date).join(format!("day={:02}", date.day()))
}
