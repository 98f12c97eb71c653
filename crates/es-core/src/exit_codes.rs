//! Exit codes for the es-core CLI.
//!
//! Exit codes communicate the outcome of a run without requiring log parsing.
//! They are stable; schedulers and cron wrappers may branch on them.

/// Exit codes for es-core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Clean run
    Clean = 0,

    /// Aggregation found no input rows for the station-day
    NoData = 1,

    /// Collection finished but at least one window failed to write
    WriteFailures = 2,

    /// Aggregation output row count did not match the expected count
    Unreconciled = 3,

    /// Configuration error
    ConfigError = 10,

    /// Collection/sensor error
    CollectionError = 11,

    /// I/O error
    IoError = 13,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates success.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean | ExitCode::NoData)
    }

    /// Check if this exit code indicates an error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<&es_common::Error> for ExitCode {
    fn from(err: &es_common::Error) -> Self {
        use es_common::Error;
        match err {
            Error::Config(_) | Error::InvalidStationId(_) => ExitCode::ConfigError,
            Error::Collection(_) => ExitCode::CollectionError,
            Error::RowCountMismatch { .. } => ExitCode::Unreconciled,
            Error::Storage(_) | Error::Io(_) => ExitCode::IoError,
            Error::Json(_) => ExitCode::InternalError,
        }
    }
}
