//! Linux thermal-zone reader used as the heat-proxy temperature.
//!
//! The file holds a single integer in millidegrees Celsius, e.g. `48312`.

use std::fs;
use std::path::{Path, PathBuf};

use es_config::DEFAULT_THERMAL_ZONE;

use super::{Capability, SensorError};

#[derive(Debug, Clone)]
pub struct ThermalZone {
    path: PathBuf,
}

impl ThermalZone {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current temperature in °C.
    pub fn read_celsius(&self) -> Result<f64, SensorError> {
        let text = fs::read_to_string(&self.path).map_err(|source| SensorError::Io {
            capability: Capability::Temperature,
            source,
        })?;
        parse_millidegrees(&text)
    }
}

impl Default for ThermalZone {
    fn default() -> Self {
        Self::new(DEFAULT_THERMAL_ZONE)
    }
}

pub fn parse_millidegrees(text: &str) -> Result<f64, SensorError> {
    let trimmed = text.trim();
    let milli: f64 = trimmed.parse().map_err(|_| SensorError::InvalidValue {
        capability: Capability::Temperature,
        detail: format!("thermal zone value '{trimmed}'"),
    })?;
    let celsius = milli / 1000.0;
    super::ensure_finite(Capability::Temperature, &[celsius])?;
    Ok(celsius)
}
