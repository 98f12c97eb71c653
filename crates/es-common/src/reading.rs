//! The reading record produced once per sampling tick.
//!
//! A reading is built by the sampler and never modified afterwards. Every
//! sensor-derived field is optional: `None` marks a capability that is
//! disabled, unavailable, or failed on this tick. Fields of one capability are
//! always set together or not at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Particle-size buckets (µm) reported by the particulate counter, in column order.
pub const PARTICLE_BUCKETS_UM: [f64; 6] = [0.3, 0.5, 1.0, 2.5, 5.0, 10.0];

/// One timestamped sample of every enabled capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,

    /// Compensated ambient temperature (°C).
    pub temperature: Option<f64>,
    /// Temperature as reported by the sensor (°C).
    pub raw_temperature: Option<f64>,
    /// hPa
    pub pressure: Option<f64>,
    /// %RH
    pub humidity: Option<f64>,

    /// Gas resistances (kΩ).
    pub oxidised: Option<f64>,
    pub reducing: Option<f64>,
    pub nh3: Option<f64>,

    pub lux: Option<f64>,
    pub proximity: Option<f64>,

    /// Mass concentrations (µg/m³).
    pub pm1: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,

    /// Particle counts per litre of air, one per [`PARTICLE_BUCKETS_UM`] bucket.
    pub particles_03um: Option<f64>,
    pub particles_05um: Option<f64>,
    pub particles_10um: Option<f64>,
    pub particles_25um: Option<f64>,
    pub particles_50um: Option<f64>,
    pub particles_100um: Option<f64>,
}

impl Reading {
    /// A reading with only time and location set.
    pub fn new(timestamp: DateTime<Utc>, latitude: f64, longitude: f64) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            temperature: None,
            raw_temperature: None,
            pressure: None,
            humidity: None,
            oxidised: None,
            reducing: None,
            nh3: None,
            lux: None,
            proximity: None,
            pm1: None,
            pm2_5: None,
            pm10: None,
            particles_03um: None,
            particles_05um: None,
            particles_10um: None,
            particles_25um: None,
            particles_50um: None,
            particles_100um: None,
        }
    }

    /// Set the six particle-count fields from bucket-ordered values.
    pub fn set_particle_counts(&mut self, counts: Option<[f64; 6]>) {
        let [c03, c05, c10, c25, c50, c100] = match counts {
            Some(c) => c.map(Some),
            None => [None; 6],
        };
        self.particles_03um = c03;
        self.particles_05um = c05;
        self.particles_10um = c10;
        self.particles_25um = c25;
        self.particles_50um = c50;
        self.particles_100um = c100;
    }

    /// True when no sensor-derived field is present.
    pub fn is_location_only(&self) -> bool {
        NUMERIC_FIELDS.iter().all(|f| (f.get)(self).is_none())
    }
}

/// Accessor pair for one nullable numeric column.
#[derive(Debug, Clone, Copy)]
pub struct NumericField {
    /// Column name in the columnar files.
    pub name: &'static str,
    pub get: fn(&Reading) -> Option<f64>,
    pub set: fn(&mut Reading, Option<f64>),
}

macro_rules! numeric_fields {
    ($($field:ident),* $(,)?) => {
        /// Every nullable numeric column of a [`Reading`], in file column order.
        pub const NUMERIC_FIELDS: &[NumericField] = &[
            $(NumericField {
                name: stringify!($field),
                get: |r| r.$field,
                set: |r, v| r.$field = v,
            },)*
        ];
    };
}

numeric_fields!(
    temperature,
    raw_temperature,
    pressure,
    humidity,
    oxidised,
    reducing,
    nh3,
    lux,
    proximity,
    pm1,
    pm2_5,
    pm10,
    particles_03um,
    particles_05um,
    particles_10um,
    particles_25um,
    particles_50um,
    particles_100um,
);
