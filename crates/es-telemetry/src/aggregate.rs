//! Daily archive aggregation.
//!
//! Reads every committed window of one station-day from the local mirror of
//! the object store and writes a single archive file, either as a plain
//! concatenation or as per-minute averages. The output is re-read and its
//! row count reconciled against the expected count.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use arrow::error::ArrowError;
use chrono::{DateTime, NaiveDate, Utc};
use es_common::{Reading, StationId, NUMERIC_FIELDS};
use es_config::{AggregationMode, ArchiveConfig, Codec};
use thiserror::Error;
use tracing::{error, info, info_span, warn};

use crate::partition::{day_partition_dir, month_partition_dir, FILE_EXTENSION};
use crate::reader::{count_rows, list_partition_files, read_readings, ReadError};
use crate::schema::readings_to_batch;
use crate::writer::{commit_parquet, writer_properties, WriteError};

const MINUTE_SECS: i64 = 60;

/// Errors from the daily aggregation job.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Only raised in copy mode; the output file has already been removed.
    #[error("row count mismatch in {path}: expected {expected}, found {actual}")]
    RowCountMismatch {
        expected: u64,
        actual: u64,
        path: PathBuf,
    },
}

/// Where raw partitions are read from and archives are written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    /// `<storage_root>/<bucket>`
    pub bucket_root: PathBuf,
    /// Key prefix of raw partitions; empty means the bucket root.
    pub prefix: String,
    pub archive_prefix: String,
    pub partition_by_day: bool,
}

impl ArchiveLayout {
    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self {
            bucket_root: config.bucket_root(),
            prefix: config.prefix.clone(),
            archive_prefix: config.archive_prefix.clone(),
            partition_by_day: config.partition_by_day,
        }
    }

    /// Day partition holding the raw windows.
    pub fn input_dir(&self, station: &StationId, date: NaiveDate) -> PathBuf {
        day_partition_dir(&self.bucket_root.join(&self.prefix), station, date)
    }

    /// Archive file for one station-day.
    pub fn output_path(&self, station: &StationId, date: NaiveDate) -> PathBuf {
        let root = self.bucket_root.join(&self.archive_prefix);
        let dir = if self.partition_by_day {
            day_partition_dir(&root, station, date)
        } else {
            month_partition_dir(&root, station, date)
        };
        dir.join(format!(
            "aggregated_{}.{FILE_EXTENSION}",
            date.format("%Y%m%d")
        ))
    }
}

/// Result of a run that found input.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationReport {
    pub output: PathBuf,
    pub mode: AggregationMode,
    pub input_files: usize,
    /// Rows according to the input file footers.
    pub input_rows: u64,
    /// Rows in the output as re-read from disk.
    pub output_rows: u64,
    pub expected_rows: u64,
    pub reconciled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationOutcome {
    /// No input rows for the station-day; nothing was written.
    NoData { input_dir: PathBuf },
    Completed(AggregationReport),
}

/// Object-store settings carried into the aggregation log context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub region: String,
    pub endpoint: String,
    pub credential_chain: Vec<String>,
    pub url_style: String,
}

impl RemoteSettings {
    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
            credential_chain: config.credential_chain.clone(),
            url_style: config.url_style.clone(),
        }
    }
}

/// Station-day aggregation job.
#[derive(Debug, Clone)]
pub struct DailyAggregator {
    layout: ArchiveLayout,
    mode: AggregationMode,
    compression: Codec,
    row_group_size: usize,
    remote: RemoteSettings,
}

impl DailyAggregator {
    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self {
            layout: ArchiveLayout::from_config(config),
            mode: config.mode,
            compression: config.compression,
            row_group_size: config.row_group_size,
            remote: RemoteSettings::from_config(config),
        }
    }

    pub fn with_mode(mut self, mode: AggregationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    pub fn remote(&self) -> &RemoteSettings {
        &self.remote
    }

    pub fn run(
        &self,
        station: &StationId,
        date: NaiveDate,
    ) -> Result<AggregationOutcome, AggregateError> {
        let span = info_span!(
            "aggregate",
            station = %station,
            date = %date,
            mode = %self.mode,
            region = %self.remote.region,
            endpoint = %self.remote.endpoint,
            credential_chain = ?self.remote.credential_chain,
            url_style = %self.remote.url_style,
        );
        let _guard = span.enter();

        let input_dir = self.layout.input_dir(station, date);
        let files = list_partition_files(&input_dir)?;
        let mut input_rows = 0u64;
        for file in &files {
            input_rows += count_rows(file)?;
        }

        if input_rows == 0 {
            info!(input_dir = %input_dir.display(), files = files.len(), "no data for station-day");
            return Ok(AggregationOutcome::NoData { input_dir });
        }
        info!(files = files.len(), rows = input_rows, "input collected");

        let mut readings = Vec::new();
        for file in &files {
            readings.extend(read_readings(file)?);
        }

        let (rows, expected_rows) = match self.mode {
            AggregationMode::Copy => (readings, input_rows),
            AggregationMode::MinuteAverage => {
                let expected = distinct_minutes(&readings) as u64;
                (minute_average(&readings), expected)
            }
        };

        let output = self.layout.output_path(station, date);
        self.write_output(&output, &rows, station)?;
        let output_rows = count_rows(&output)?;
        let reconciled = output_rows == expected_rows;

        if !reconciled {
            match self.mode {
                AggregationMode::Copy => {
                    error!(
                        path = %output.display(),
                        expected = expected_rows,
                        actual = output_rows,
                        "row count mismatch, removing output"
                    );
                    let _ = fs::remove_file(&output);
                    return Err(AggregateError::RowCountMismatch {
                        expected: expected_rows,
                        actual: output_rows,
                        path: output,
                    });
                }
                AggregationMode::MinuteAverage => warn!(
                    path = %output.display(),
                    expected = expected_rows,
                    actual = output_rows,
                    "row count mismatch, keeping output"
                ),
            }
        } else {
            info!(path = %output.display(), rows = output_rows, "archive written and reconciled");
        }

        Ok(AggregationOutcome::Completed(AggregationReport {
            output,
            mode: self.mode,
            input_files: files.len(),
            input_rows,
            output_rows,
            expected_rows,
            reconciled,
        }))
    }

    fn write_output(
        &self,
        output: &Path,
        rows: &[Reading],
        station: &StationId,
    ) -> Result<(), AggregateError> {
        if let Some(dir) = output.parent() {
            fs::create_dir_all(dir).map_err(|source| WriteError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let batch = readings_to_batch(rows)?;
        let props = writer_properties(self.compression, self.row_group_size, station);
        commit_parquet(output, &batch, props)?;
        Ok(())
    }
}

fn minute_of(reading: &Reading) -> i64 {
    reading.timestamp.timestamp().div_euclid(MINUTE_SECS)
}

fn distinct_minutes(readings: &[Reading]) -> usize {
    readings.iter().map(minute_of).collect::<BTreeSet<_>>().len()
}

struct MinuteBucket<'a> {
    first: &'a Reading,
    sums: Vec<f64>,
    counts: Vec<u32>,
}

/// Average readings per UTC minute.
///
/// Each output row is stamped with the start of its minute and carries the
/// location of the bucket's earliest reading. Numeric columns are averaged
/// over their present values; a column with no values in a bucket stays
/// `None`. Rows are ordered by minute.
pub fn minute_average(readings: &[Reading]) -> Vec<Reading> {
    let mut buckets: BTreeMap<i64, MinuteBucket<'_>> = BTreeMap::new();

    for reading in readings {
        let bucket = buckets.entry(minute_of(reading)).or_insert_with(|| MinuteBucket {
            first: reading,
            sums: vec![0.0; NUMERIC_FIELDS.len()],
            counts: vec![0; NUMERIC_FIELDS.len()],
        });
        if reading.timestamp < bucket.first.timestamp {
            bucket.first = reading;
        }
        for (i, field) in NUMERIC_FIELDS.iter().enumerate() {
            if let Some(v) = (field.get)(reading) {
                bucket.sums[i] += v;
                bucket.counts[i] += 1;
            }
        }
    }

    buckets
        .into_iter()
        .filter_map(|(minute, bucket)| {
            let start: DateTime<Utc> = DateTime::from_timestamp(minute * MINUTE_SECS, 0)?;
            let mut row = Reading::new(start, bucket.first.latitude, bucket.first.longitude);
            for (i, field) in NUMERIC_FIELDS.iter().enumerate() {
                let mean = (bucket.counts[i] > 0).then(|| bucket.sums[i] / f64::from(bucket.counts[i]));
                (field.set)(&mut row, mean);
            }
            Some(row)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, h, m, s).unwrap()
    }

    fn layout(partition_by_day: bool) -> ArchiveLayout {
        ArchiveLayout {
            bucket_root: PathBuf::from("/mirror/output"),
            prefix: String::new(),
            archive_prefix: "archive_daily".to_string(),
            partition_by_day,
        }
    }

    #[test]
    fn layout_paths() {
        let station = StationId::parse("01").unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();

        assert_eq!(
            layout(true).input_dir(&station, date),
            PathBuf::from("/mirror/output/station=01/year=2026/month=10/day=18")
        );
        assert_eq!(
            layout(true).output_path(&station, date),
            PathBuf::from(
                "/mirror/output/archive_daily/station=01/year=2026/month=10/day=18/aggregated_20261018.parquet"
            )
        );
        assert_eq!(
            layout(false).output_path(&station, date),
            PathBuf::from(
                "/mirror/output/archive_daily/station=01/year=2026/month=10/aggregated_20261018.parquet"
            )
        );
    }

    #[test]
    fn remote_settings_come_from_config() {
        let mut config = ArchiveConfig::default();
        config.credential_chain = vec!["env".to_string(), "config".to_string()];
        config.url_style = "vhost".to_string();
        let aggregator = DailyAggregator::from_config(&config);
        assert_eq!(
            aggregator.remote(),
            &RemoteSettings {
                region: "us-west-2".to_string(),
                endpoint: "data.source.coop".to_string(),
                credential_chain: vec!["env".to_string(), "config".to_string()],
                url_style: "vhost".to_string(),
            }
        );
    }

    #[test]
    fn prefix_nests_input() {
        let mut l = layout(true);
        l.prefix = "raw".to_string();
        let station = StationId::parse("st-2").unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        assert_eq!(
            l.input_dir(&station, date),
            PathBuf::from("/mirror/output/raw/station=st-2/year=2026/month=01/day=02")
        );
    }

    #[test]
    fn minute_average_groups_and_orders() {
        let mut a = Reading::new(at(12, 1, 30), 1.0, 2.0);
        a.temperature = Some(20.0);
        let mut b = Reading::new(at(12, 0, 10), 3.0, 4.0);
        b.temperature = Some(10.0);
        b.pm1 = Some(5.0);
        let mut c = Reading::new(at(12, 0, 50), 5.0, 6.0);
        c.temperature = Some(14.0);
        let mut d = Reading::new(at(12, 1, 5), 7.0, 8.0);
        d.temperature = Some(30.0);

        let out = minute_average(&[a, b, c, d]);
        assert_eq!(out.len(), 2);

        assert_eq!(out[0].timestamp, at(12, 0, 0));
        assert_eq!(out[0].temperature, Some(12.0));
        assert_eq!(out[0].pm1, Some(5.0));
        assert_eq!((out[0].latitude, out[0].longitude), (3.0, 4.0));

        assert_eq!(out[1].timestamp, at(12, 1, 0));
        assert_eq!(out[1].temperature, Some(25.0));
        assert!(out[1].pm1.is_none());
        // earliest reading of the minute supplies the location
        assert_eq!((out[1].latitude, out[1].longitude), (7.0, 8.0));
    }

    #[test]
    fn minute_average_of_nothing_is_empty() {
        assert!(minute_average(&[]).is_empty());
        assert_eq!(distinct_minutes(&[]), 0);
    }
}
