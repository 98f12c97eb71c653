//! Station identity.
//!
//! A station id ends up verbatim in the partition path (`station=<id>`), so it
//! is restricted to characters that can never form a path separator or a
//! `key=value` ambiguity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

/// Station identifier, e.g. `01`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationId(String);

impl StationId {
    /// Parse and validate a station id.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let valid = !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(StationId(s.to_string()))
        } else {
            Err(Error::InvalidStationId(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StationId {
    fn default() -> Self {
        StationId("01".to_string())
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for StationId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StationId::parse(&value)
    }
}

impl From<StationId> for String {
    fn from(id: StationId) -> Self {
        id.0
    }
}
