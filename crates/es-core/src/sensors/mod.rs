//! Sensor capability interface.
//!
//! A [`SensorPort`] exposes one read method per [`Capability`]. Each method
//! may fail independently; the sampler turns a failure into absent fields for
//! that capability only. Which capabilities are used is decided once at
//! startup by [`CapabilitySet::resolve`].

pub mod simulated;
pub mod thermal;

use std::fmt;
use std::io;

use es_config::{CapabilityToggle, SensorsConfig};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub use simulated::SimulatedPort;
pub use thermal::ThermalZone;

/// One independently failing sensor function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Temperature,
    Pressure,
    Humidity,
    Gas,
    Light,
    Particulates,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::Temperature,
        Capability::Pressure,
        Capability::Humidity,
        Capability::Gas,
        Capability::Light,
        Capability::Particulates,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Capability::Temperature => "temperature",
            Capability::Pressure => "pressure",
            Capability::Humidity => "humidity",
            Capability::Gas => "gas",
            Capability::Light => "light",
            Capability::Particulates => "particulates",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Configured switch for this capability.
    pub fn toggle(self, config: &SensorsConfig) -> CapabilityToggle {
        match self {
            Capability::Temperature => config.temperature,
            Capability::Pressure => config.pressure,
            Capability::Humidity => config.humidity,
            Capability::Gas => config.gas,
            Capability::Light => config.light,
            Capability::Particulates => config.particulates,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors from a single capability read.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("{0} read timed out")]
    Timeout(Capability),

    #[error("{capability} returned an invalid value: {detail}")]
    InvalidValue {
        capability: Capability,
        detail: String,
    },

    #[error("{0} sensor not present")]
    Unavailable(Capability),

    #[error("{capability} I/O error: {source}")]
    Io {
        capability: Capability,
        #[source]
        source: io::Error,
    },
}

impl SensorError {
    pub fn capability(&self) -> Capability {
        match self {
            SensorError::Timeout(c) | SensorError::Unavailable(c) => *c,
            SensorError::InvalidValue { capability, .. } | SensorError::Io { capability, .. } => {
                *capability
            }
        }
    }
}

/// Reject NaN and infinities as an invalid value of `capability`.
pub fn ensure_finite(capability: Capability, values: &[f64]) -> Result<(), SensorError> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(bad) => Err(SensorError::InvalidValue {
            capability,
            detail: format!("non-finite value {bad}"),
        }),
        None => Ok(()),
    }
}

/// Raw temperature plus the heat-proxy temperature, both °C.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureReading {
    pub raw: f64,
    /// `None` when the proxy source could not be read.
    pub proxy: Option<f64>,
}

/// Gas sensor resistances in ohms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasReading {
    pub oxidised: f64,
    pub reducing: f64,
    pub nh3: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightReading {
    pub lux: f64,
    pub proximity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticulateReading {
    pub pm1: f64,
    pub pm2_5: f64,
    pub pm10: f64,
    /// Per-litre counts in `PARTICLE_BUCKETS_UM` order.
    pub counts: [f64; 6],
}

/// Access to the station's sensors.
pub trait SensorPort {
    /// Check once whether a capability is physically present.
    fn probe(&mut self, capability: Capability) -> Result<(), SensorError>;

    fn read_temperature_and_proxy(&mut self) -> Result<TemperatureReading, SensorError>;
    /// hPa
    fn read_pressure(&mut self) -> Result<f64, SensorError>;
    /// %RH
    fn read_humidity(&mut self) -> Result<f64, SensorError>;
    fn read_gas(&mut self) -> Result<GasReading, SensorError>;
    fn read_light(&mut self) -> Result<LightReading, SensorError>;
    fn read_particulates(&mut self) -> Result<ParticulateReading, SensorError>;
}

impl<P: SensorPort + ?Sized> SensorPort for Box<P> {
    fn probe(&mut self, capability: Capability) -> Result<(), SensorError> {
        (**self).probe(capability)
    }
    fn read_temperature_and_proxy(&mut self) -> Result<TemperatureReading, SensorError> {
        (**self).read_temperature_and_proxy()
    }
    fn read_pressure(&mut self) -> Result<f64, SensorError> {
        (**self).read_pressure()
    }
    fn read_humidity(&mut self) -> Result<f64, SensorError> {
        (**self).read_humidity()
    }
    fn read_gas(&mut self) -> Result<GasReading, SensorError> {
        (**self).read_gas()
    }
    fn read_light(&mut self) -> Result<LightReading, SensorError> {
        (**self).read_light()
    }
    fn read_particulates(&mut self) -> Result<ParticulateReading, SensorError> {
        (**self).read_particulates()
    }
}

/// Resolved availability of one capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityState {
    Enabled,
    /// Switched off by configuration.
    Disabled,
    /// Switched on but the probe failed.
    Unavailable,
}

/// Per-capability state, fixed after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySet {
    states: [CapabilityState; 6],
}

impl CapabilitySet {
    pub fn all_enabled() -> Self {
        Self {
            states: [CapabilityState::Enabled; 6],
        }
    }

    pub fn with(mut self, capability: Capability, state: CapabilityState) -> Self {
        self.states[capability.index()] = state;
        self
    }

    /// Probe every configured capability once.
    pub fn resolve<P: SensorPort + ?Sized>(config: &SensorsConfig, port: &mut P) -> Self {
        let mut set = Self::all_enabled();
        for capability in Capability::ALL {
            let state = if !capability.toggle(config).is_enabled() {
                CapabilityState::Disabled
            } else {
                match port.probe(capability) {
                    Ok(()) => CapabilityState::Enabled,
                    Err(e) => {
                        warn!(capability = %capability, error = %e, "capability unavailable");
                        CapabilityState::Unavailable
                    }
                }
            };
            set.states[capability.index()] = state;
        }
        info!(
            enabled = ?set.enabled().collect::<Vec<_>>(),
            "capabilities resolved"
        );
        set
    }

    pub fn state(&self, capability: Capability) -> CapabilityState {
        self.states[capability.index()]
    }

    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.state(capability) == CapabilityState::Enabled
    }

    pub fn enabled(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL
            .into_iter()
            .filter(|c| self.is_enabled(*c))
    }
}
