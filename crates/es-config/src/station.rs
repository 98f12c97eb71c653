//! Station configuration types.
//!
//! These types map one-to-one onto `station.toml`. Every section and key is
//! optional; omitted values take the defaults below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use es_common::StationId;
use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// Complete station configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StationConfig {
    pub station_id: String,
    /// Static station location, degrees north.
    pub latitude: f64,
    /// Static station location, degrees east.
    pub longitude: f64,
    /// Root of the partitioned output tree.
    pub output_dir: PathBuf,
    pub sampling: SamplingConfig,
    pub sensors: SensorsConfig,
    pub compensation: CompensationConfig,
    pub writer: WriterSettings,
    pub archive: ArchiveConfig,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            station_id: "01".to_string(),
            latitude: 30.0626,
            longitude: 31.4916,
            output_dir: PathBuf::from("output"),
            sampling: SamplingConfig::default(),
            sensors: SensorsConfig::default(),
            compensation: CompensationConfig::default(),
            writer: WriterSettings::default(),
            archive: ArchiveConfig::default(),
        }
    }
}

impl StationConfig {
    /// Parse from TOML text. Does not run semantic validation.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ValidationError> {
        toml::from_str(text).map_err(|e| ValidationError::Parse {
            path: origin.to_path_buf(),
            message: e.message().to_string(),
        })
    }

    /// Load from file. Does not run semantic validation.
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let text = std::fs::read_to_string(path).map_err(|source| ValidationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// The validated station id.
    pub fn station(&self) -> Result<StationId, es_common::Error> {
        StationId::parse(&self.station_id)
    }
}

/// Tick cadence and window geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingConfig {
    /// Nominal time between two sensor reads.
    pub read_interval_ms: u64,
    /// Length of one batch window.
    pub batch_duration_secs: u64,
    /// Grid every window boundary is aligned to.
    pub alignment_secs: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            read_interval_ms: 1000,
            batch_duration_secs: 300,
            alignment_secs: 300,
        }
    }
}

impl SamplingConfig {
    pub fn read_interval(&self) -> Duration {
        Duration::from_millis(self.read_interval_ms)
    }

    pub fn batch_duration(&self) -> Duration {
        Duration::from_secs(self.batch_duration_secs)
    }

    pub fn alignment(&self) -> Duration {
        Duration::from_secs(self.alignment_secs)
    }
}

/// Whether a capability should be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityToggle {
    Enabled,
    Disabled,
}

impl CapabilityToggle {
    pub fn is_enabled(self) -> bool {
        self == CapabilityToggle::Enabled
    }
}

/// Source of sensor readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorBackend {
    /// Seeded synthetic environment.
    Simulated,
}

/// Default board temperature source on Linux single-board computers.
pub const DEFAULT_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Sensor capability switches and backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorsConfig {
    pub backend: SensorBackend,
    pub temperature: CapabilityToggle,
    pub pressure: CapabilityToggle,
    pub humidity: CapabilityToggle,
    pub gas: CapabilityToggle,
    pub light: CapabilityToggle,
    pub particulates: CapabilityToggle,
    /// Seed for the simulated backend.
    pub seed: u64,
    /// Probability that a simulated particulate read times out.
    pub particulate_timeout_rate: f64,
    /// Thermal-zone file used as the proxy temperature (millidegrees Celsius).
    pub proxy_source: Option<PathBuf>,
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            backend: SensorBackend::Simulated,
            temperature: CapabilityToggle::Enabled,
            pressure: CapabilityToggle::Enabled,
            humidity: CapabilityToggle::Enabled,
            gas: CapabilityToggle::Enabled,
            light: CapabilityToggle::Enabled,
            particulates: CapabilityToggle::Enabled,
            seed: 7,
            particulate_timeout_rate: 0.0,
            proxy_source: Some(PathBuf::from(DEFAULT_THERMAL_ZONE)),
        }
    }
}

/// Ambient temperature compensation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompensationConfig {
    pub enabled: bool,
    /// Divisor applied to the proxy/raw temperature gap.
    pub factor: f64,
    /// Proxy temperature assumed when the proxy source cannot be read.
    pub fallback_proxy_celsius: f64,
}

impl Default for CompensationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            factor: 2.25,
            fallback_proxy_celsius: 40.0,
        }
    }
}

/// Compression codec for columnar files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Codec {
    Snappy,
    Zstd,
    Uncompressed,
}

/// How a window boundary becomes a file name inside its day partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilenameScheme {
    /// Pick from the batch duration: ≤5 min → minute, ≤1 h → hour, else day.
    Auto,
    /// `data_<HHMM>`
    Minute,
    /// `data_<HH>`
    Hour,
    /// `data`
    Day,
}

impl FilenameScheme {
    /// Resolve `Auto` against a batch duration. Explicit schemes are returned unchanged.
    pub fn resolve(self, batch_duration_secs: u64) -> FilenameScheme {
        match self {
            FilenameScheme::Auto if batch_duration_secs <= 300 => FilenameScheme::Minute,
            FilenameScheme::Auto if batch_duration_secs <= 3600 => FilenameScheme::Hour,
            FilenameScheme::Auto => FilenameScheme::Day,
            explicit => explicit,
        }
    }

    /// Smallest distance between two boundaries that still yields distinct names.
    pub fn resolution_secs(self) -> u64 {
        match self {
            FilenameScheme::Auto | FilenameScheme::Minute => 60,
            FilenameScheme::Hour => 3600,
            FilenameScheme::Day => 86_400,
        }
    }

    /// Whether windows of this duration can never share a file name within a day.
    pub fn separates_windows(self, batch_duration_secs: u64) -> bool {
        batch_duration_secs >= self.resolve(batch_duration_secs).resolution_secs()
    }
}

/// Columnar writer settings for raw telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriterSettings {
    pub compression: Codec,
    pub row_group_size: usize,
    pub filename_scheme: FilenameScheme,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            compression: Codec::Snappy,
            row_group_size: 65_536,
            filename_scheme: FilenameScheme::Auto,
        }
    }
}

/// Daily aggregation output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Concatenate every row as-is.
    Copy,
    /// One row per minute, numeric columns averaged.
    MinuteAverage,
}

impl std::fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationMode::Copy => write!(f, "copy"),
            AggregationMode::MinuteAverage => write!(f, "minute_average"),
        }
    }
}

/// Daily archive job settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Local directory mirroring the object store; buckets are its subdirectories.
    pub storage_root: PathBuf,
    pub bucket: String,
    /// Key prefix of the raw partitions inside the bucket (may be empty).
    pub prefix: String,
    /// Key prefix of the archive partitions inside the bucket.
    pub archive_prefix: String,
    pub mode: AggregationMode,
    /// Add a `day=<DD>` level to the archive path.
    pub partition_by_day: bool,
    pub compression: Codec,
    pub row_group_size: usize,
    pub region: String,
    pub endpoint: String,
    pub credential_chain: Vec<String>,
    pub url_style: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("."),
            bucket: "output".to_string(),
            prefix: String::new(),
            archive_prefix: "archive_daily".to_string(),
            mode: AggregationMode::Copy,
            partition_by_day: true,
            compression: Codec::Zstd,
            row_group_size: 65_536,
            region: "us-west-2".to_string(),
            endpoint: "data.source.coop".to_string(),
            credential_chain: vec!["env".to_string()],
            url_style: "path".to_string(),
        }
    }
}

impl ArchiveConfig {
    /// Root of the bucket in the local mirror.
    pub fn bucket_root(&self) -> PathBuf {
        self.storage_root.join(&self.bucket)
    }
}
