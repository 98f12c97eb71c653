//! Error types for Enviro Station.

use thiserror::Error;

/// Result type alias for Enviro Station operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Enviro Station.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid station id '{0}': use letters, digits, '-' or '_'")]
    InvalidStationId(String),

    // Collection errors (20-29)
    #[error("sensor collection failed: {0}")]
    Collection(String),

    // Storage errors (30-39)
    #[error("storage error: {0}")]
    Storage(String),

    #[error("row count mismatch: expected {expected}, found {actual}")]
    RowCountMismatch { expected: u64, actual: u64 },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in logs.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidStationId(_) => 11,
            Error::Collection(_) => 20,
            Error::Storage(_) => 30,
            Error::RowCountMismatch { .. } => 32,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_grouped_by_category() {
        assert_eq!(Error::Config("x".into()).code(), 10);
        assert_eq!(Error::Collection("x".into()).code(), 20);
        assert_eq!(
            Error::RowCountMismatch {
                expected: 3,
                actual: 2
            }
            .code(),
            32
        );
        let io = Error::from(std::io::Error::other("disk"));
        assert_eq!(io.code(), 60);
    }

    #[test]
    fn messages_include_context() {
        let err = Error::InvalidStationId("a/b".into());
        assert_eq!(
            err.to_string(),
            "invalid station id 'a/b': use letters, digits, '-' or '_'"
        );
    }
}
