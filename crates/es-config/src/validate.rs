//! Semantic validation for station configuration.
//!
//! Parsing only checks shape. `validate` checks the relationships between
//! values and collects every problem before reporting.

use std::path::PathBuf;

use es_common::StationId;
use thiserror::Error;

use crate::station::StationConfig;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Dotted key path, e.g. `sampling.alignment_secs`.
    pub field: String,
    pub message: String,
}

impl Issue {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {}", join_issues(.0))]
    Invalid(Vec<Issue>),
}

fn join_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(Issue::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Longest batch window accepted: one week.
pub const MAX_BATCH_DURATION_SECS: u64 = 7 * 86_400;

/// Result type for configuration loading.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Check every cross-field rule. Returns all issues found.
pub fn validate(config: &StationConfig) -> ValidationResult<()> {
    let mut issues = Vec::new();

    if StationId::parse(&config.station_id).is_err() {
        issues.push(Issue::new(
            "station_id",
            format!(
                "'{}' must be non-empty and use only letters, digits, '-' or '_'",
                config.station_id
            ),
        ));
    }
    if !(-90.0..=90.0).contains(&config.latitude) {
        issues.push(Issue::new("latitude", "must be within [-90, 90]"));
    }
    if !(-180.0..=180.0).contains(&config.longitude) {
        issues.push(Issue::new("longitude", "must be within [-180, 180]"));
    }

    let sampling = &config.sampling;
    if sampling.read_interval_ms == 0 {
        issues.push(Issue::new("sampling.read_interval_ms", "must be positive"));
    }
    if sampling.batch_duration_secs == 0 {
        issues.push(Issue::new("sampling.batch_duration_secs", "must be positive"));
    }
    if sampling.batch_duration_secs > MAX_BATCH_DURATION_SECS {
        issues.push(Issue::new(
            "sampling.batch_duration_secs",
            format!("must be at most {MAX_BATCH_DURATION_SECS}s (one week)"),
        ));
    }
    if sampling.alignment_secs == 0 {
        issues.push(Issue::new("sampling.alignment_secs", "must be positive"));
    }
    if sampling.batch_duration_secs > 0
        && sampling.alignment_secs > 0
        && sampling.batch_duration_secs % sampling.alignment_secs != 0
    {
        issues.push(Issue::new(
            "sampling.batch_duration_secs",
            format!(
                "{}s is not a multiple of the {}s alignment grid",
                sampling.batch_duration_secs, sampling.alignment_secs
            ),
        ));
    }

    let scheme = config.writer.filename_scheme;
    if sampling.batch_duration_secs > 0 && !scheme.separates_windows(sampling.batch_duration_secs)
    {
        let resolved = scheme.resolve(sampling.batch_duration_secs);
        issues.push(Issue::new(
            "writer.filename_scheme",
            format!(
                "{resolved:?} file names repeat within {}s, shorter than the {}s batch duration allows; \
                 choose a finer scheme or a longer batch",
                resolved.resolution_secs(),
                sampling.batch_duration_secs
            ),
        ));
    }
    if config.writer.row_group_size == 0 {
        issues.push(Issue::new("writer.row_group_size", "must be positive"));
    }

    let comp = &config.compensation;
    if !(comp.factor.is_finite() && comp.factor > 0.0) {
        issues.push(Issue::new("compensation.factor", "must be a positive number"));
    }
    if !comp.fallback_proxy_celsius.is_finite() {
        issues.push(Issue::new(
            "compensation.fallback_proxy_celsius",
            "must be a finite number",
        ));
    }

    let rate = config.sensors.particulate_timeout_rate;
    if !(0.0..=1.0).contains(&rate) {
        issues.push(Issue::new(
            "sensors.particulate_timeout_rate",
            "must be within [0, 1]",
        ));
    }

    let archive = &config.archive;
    if archive.bucket.trim().is_empty() {
        issues.push(Issue::new("archive.bucket", "must not be empty"));
    }
    if archive.archive_prefix.trim_matches('/').is_empty() {
        issues.push(Issue::new(
            "archive.archive_prefix",
            "must not be empty (archives would mix with raw partitions)",
        ));
    }
    if archive.row_group_size == 0 {
        issues.push(Issue::new("archive.row_group_size", "must be positive"));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Invalid(issues))
    }
}
