//! Enviro Station telemetry storage.
//!
//! This crate provides:
//! - Arrow schema definition for the readings table
//! - Partition path layout (`station=/year=/month=/day=/<file>`)
//! - Partitioned Parquet writer with temp-then-rename commits
//! - Partition readers and the daily archive aggregator

pub mod aggregate;
pub mod partition;
pub mod reader;
pub mod schema;
pub mod writer;

pub use aggregate::{
    minute_average, AggregateError, AggregationOutcome, AggregationReport, ArchiveLayout,
    DailyAggregator, RemoteSettings,
};
pub use partition::{day_partition_dir, PartitionKey, FILE_EXTENSION};
pub use reader::{count_rows, list_partition_files, read_readings, ReadError};
pub use schema::{batch_to_readings, readings_schema, readings_to_batch};
pub use writer::{PartitionedWriter, WriteError, WriterConfig};

/// Parquet key/value metadata key holding the file schema version.
pub const SCHEMA_VERSION_KEY: &str = "es.schema_version";

/// Parquet key/value metadata key holding the station id.
pub const STATION_ID_KEY: &str = "es.station_id";
