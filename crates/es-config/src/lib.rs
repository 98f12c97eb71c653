//! Enviro Station configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for `station.toml`, every key optional with defaults
//! - Config resolution (CLI path → user config dir → defaults)
//! - Semantic validation that reports every problem at once

pub mod resolve;
pub mod station;
pub mod validate;

pub use resolve::{resolve_config, ConfigSource, ResolvedConfig};
pub use station::{
    AggregationMode, ArchiveConfig, CapabilityToggle, Codec, CompensationConfig,
    FilenameScheme, SamplingConfig, SensorBackend, SensorsConfig, StationConfig,
    WriterSettings, DEFAULT_THERMAL_ZONE,
};
pub use validate::{
    validate, Issue, ValidationError, ValidationResult, MAX_BATCH_DURATION_SECS,
};

/// File name looked up inside the user config directory.
pub const CONFIG_FILE_NAME: &str = "station.toml";
