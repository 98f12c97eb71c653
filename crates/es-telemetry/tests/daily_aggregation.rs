//! Daily aggregation over a local object-store mirror.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use es_common::{Reading, StationId};
use es_config::{AggregationMode, ArchiveConfig};
use es_telemetry::{
    count_rows, read_readings, AggregationOutcome, DailyAggregator, PartitionedWriter,
    WriterConfig,
};
use tempfile::{tempdir, TempDir};

fn station() -> StationId {
    StationId::parse("01").unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

fn archive_config(root: &TempDir) -> ArchiveConfig {
    ArchiveConfig {
        storage_root: root.path().to_path_buf(),
        ..ArchiveConfig::default()
    }
}

fn reading(ts: DateTime<Utc>, temperature: f64) -> Reading {
    let mut r = Reading::new(ts, 30.0626, 31.4916);
    r.temperature = Some(temperature);
    r.humidity = Some(40.0);
    r
}

/// Write windows ending at 12:01 and 12:02 with readings every 20 seconds.
fn seed_two_windows(config: &ArchiveConfig) {
    let writer = PartitionedWriter::new(WriterConfig::new(config.bucket_root()));
    let t0 = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();

    let first: Vec<_> = (0..3)
        .map(|i| reading(t0 + Duration::seconds(20 * i), 10.0 + i as f64))
        .collect();
    let second: Vec<_> = (3..7)
        .map(|i| reading(t0 + Duration::seconds(20 * i), 10.0 + i as f64))
        .collect();

    writer
        .write(&first, t0 + Duration::minutes(1), &station())
        .unwrap();
    writer
        .write(&second, t0 + Duration::minutes(2), &station())
        .unwrap();
}

#[test]
fn no_input_files_is_no_data_without_write() {
    let root = tempdir().unwrap();
    let config = archive_config(&root);

    let outcome = DailyAggregator::from_config(&config)
        .run(&station(), day())
        .unwrap();

    assert!(matches!(outcome, AggregationOutcome::NoData { .. }));
    assert!(!config.bucket_root().join("archive_daily").exists());
}

#[test]
fn zero_row_files_are_no_data() {
    let root = tempdir().unwrap();
    let config = archive_config(&root);
    let writer = PartitionedWriter::new(WriterConfig::new(config.bucket_root()));
    let boundary = Utc.with_ymd_and_hms(2026, 10, 18, 12, 5, 0).unwrap();
    writer.write(&[], boundary, &station()).unwrap();

    let outcome = DailyAggregator::from_config(&config)
        .run(&station(), day())
        .unwrap();
    assert!(matches!(outcome, AggregationOutcome::NoData { .. }));
    assert!(!config.bucket_root().join("archive_daily").exists());
}

#[test]
fn copy_mode_concatenates_every_row() {
    let root = tempdir().unwrap();
    let config = archive_config(&root);
    seed_two_windows(&config);

    let outcome = DailyAggregator::from_config(&config)
        .run(&station(), day())
        .unwrap();
    let AggregationOutcome::Completed(report) = outcome else {
        panic!("expected a completed aggregation");
    };

    assert_eq!(report.mode, AggregationMode::Copy);
    assert_eq!(report.input_files, 2);
    assert_eq!(report.input_rows, 7);
    assert_eq!(report.expected_rows, 7);
    assert_eq!(report.output_rows, 7);
    assert!(report.reconciled);
    assert_eq!(
        report.output,
        config
            .bucket_root()
            .join("archive_daily/station=01/year=2026/month=10/day=18/aggregated_20261018.parquet")
    );

    let rows = read_readings(&report.output).unwrap();
    let temps: Vec<_> = rows.iter().map(|r| r.temperature.unwrap()).collect();
    assert_eq!(temps, vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
}

#[test]
fn minute_average_mode_writes_one_row_per_minute() {
    let root = tempdir().unwrap();
    let config = ArchiveConfig {
        partition_by_day: false,
        ..archive_config(&root)
    };
    seed_two_windows(&config);

    let outcome = DailyAggregator::from_config(&config)
        .with_mode(AggregationMode::MinuteAverage)
        .run(&station(), day())
        .unwrap();
    let AggregationOutcome::Completed(report) = outcome else {
        panic!("expected a completed aggregation");
    };

    assert_eq!(report.input_rows, 7);
    assert_eq!(report.expected_rows, 3);
    assert!(report.reconciled);
    assert!(report
        .output
        .ends_with("archive_daily/station=01/year=2026/month=10/aggregated_20261018.parquet"));
    assert_eq!(count_rows(&report.output).unwrap(), 3);

    // 12:00 holds 10,11,12; 12:01 holds 13,14,15; 12:02 holds 16
    let rows = read_readings(&report.output).unwrap();
    let temps: Vec<_> = rows.iter().map(|r| r.temperature.unwrap()).collect();
    assert_eq!(temps, vec![11.0, 14.0, 16.0]);
    assert!(rows.iter().all(|r| r.humidity == Some(40.0)));
    assert!(rows.iter().all(|r| r.pm1.is_none()));
    assert_eq!(
        rows[1].timestamp,
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 1, 0).unwrap()
    );
}

#[test]
fn other_days_are_ignored() {
    let root = tempdir().unwrap();
    let config = archive_config(&root);
    seed_two_windows(&config);

    let outcome = DailyAggregator::from_config(&config)
        .run(&station(), day().succ_opt().unwrap())
        .unwrap();
    assert!(matches!(outcome, AggregationOutcome::NoData { .. }));
}
