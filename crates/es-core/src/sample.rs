//! One reading per tick.
//!
//! The sampler reads every enabled capability once, in a fixed order, and
//! merges the results with time, location and the compensated temperature.
//! A failed capability leaves its fields absent; the rest of the reading is
//! kept.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use es_common::Reading;
use serde::Serialize;
use tracing::{debug, warn};

use crate::calibrate::CompensationFilter;
use crate::sensors::{ensure_finite, Capability, CapabilitySet, SensorError, SensorPort};

/// Running counters of the sampler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SamplerStats {
    pub samples: u64,
    pub capability_failures: BTreeMap<Capability, u64>,
    /// Temperature reads whose proxy was unavailable.
    pub proxy_fallbacks: u64,
}

impl SamplerStats {
    pub fn total_failures(&self) -> u64 {
        self.capability_failures.values().sum()
    }
}

pub struct Sampler<P> {
    port: P,
    capabilities: CapabilitySet,
    filter: CompensationFilter,
    latitude: f64,
    longitude: f64,
    stats: SamplerStats,
}

impl<P: SensorPort> Sampler<P> {
    pub fn new(
        port: P,
        capabilities: CapabilitySet,
        filter: CompensationFilter,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            port,
            capabilities,
            filter,
            latitude,
            longitude,
            stats: SamplerStats::default(),
        }
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn stats(&self) -> &SamplerStats {
        &self.stats
    }

    /// Take one reading stamped with `now`.
    pub fn sample(&mut self, now: DateTime<Utc>) -> Reading {
        let mut reading = Reading::new(now, self.latitude, self.longitude);
        self.stats.samples += 1;

        for capability in Capability::ALL {
            if !self.capabilities.is_enabled(capability) {
                continue;
            }
            if let Err(e) = self.read_into(capability, &mut reading) {
                self.record_failure(e);
            }
        }
        reading
    }

    fn read_into(&mut self, capability: Capability, r: &mut Reading) -> Result<(), SensorError> {
        match capability {
            Capability::Temperature => {
                let t = self.port.read_temperature_and_proxy()?;
                ensure_finite(capability, &[t.raw])?;
                let proxy = t.proxy.filter(|p| p.is_finite());
                if proxy.is_none() {
                    self.stats.proxy_fallbacks += 1;
                    debug!("proxy temperature unavailable, using fallback");
                }
                r.raw_temperature = Some(t.raw);
                r.temperature = Some(self.filter.compensate(t.raw, proxy));
            }
            Capability::Pressure => {
                let v = self.port.read_pressure()?;
                ensure_finite(capability, &[v])?;
                r.pressure = Some(v);
            }
            Capability::Humidity => {
                let v = self.port.read_humidity()?;
                ensure_finite(capability, &[v])?;
                r.humidity = Some(v);
            }
            Capability::Gas => {
                let g = self.port.read_gas()?;
                ensure_finite(capability, &[g.oxidised, g.reducing, g.nh3])?;
                r.oxidised = Some(g.oxidised / 1000.0);
                r.reducing = Some(g.reducing / 1000.0);
                r.nh3 = Some(g.nh3 / 1000.0);
            }
            Capability::Light => {
                let l = self.port.read_light()?;
                ensure_finite(capability, &[l.lux, l.proximity])?;
                r.lux = Some(l.lux);
                r.proximity = Some(l.proximity);
            }
            Capability::Particulates => {
                let p = self.port.read_particulates()?;
                ensure_finite(capability, &[p.pm1, p.pm2_5, p.pm10])?;
                ensure_finite(capability, &p.counts)?;
                r.pm1 = Some(p.pm1);
                r.pm2_5 = Some(p.pm2_5);
                r.pm10 = Some(p.pm10);
                r.set_particle_counts(Some(p.counts));
            }
        }
        Ok(())
    }

    fn record_failure(&mut self, error: SensorError) {
        let capability = error.capability();
        *self.stats.capability_failures.entry(capability).or_default() += 1;
        warn!(capability = %capability, error = %error, "capability read failed");
    }
}
