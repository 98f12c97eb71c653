//! Seeded synthetic sensor backend.
//!
//! Produces plausible, slowly varying values so a station can run end to end
//! without hardware. The same seed always yields the same sequence.

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{
    Capability, GasReading, LightReading, ParticulateReading, SensorError, SensorPort,
    TemperatureReading, ThermalZone,
};

/// Temperature reads per simulated day (one per second).
const DAY_STEPS: f64 = 86_400.0;

#[derive(Debug)]
pub struct SimulatedPort {
    rng: StdRng,
    step: u64,
    missing: Vec<Capability>,
    particulate_timeout_rate: f64,
    proxy: Option<ThermalZone>,
}

impl SimulatedPort {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            step: 0,
            missing: Vec::new(),
            particulate_timeout_rate: 0.0,
            proxy: None,
        }
    }

    /// Pretend a capability's hardware is absent: its probe and reads fail.
    pub fn without(mut self, capability: Capability) -> Self {
        self.missing.push(capability);
        self
    }

    /// Probability in `[0, 1]` that a particulate read times out.
    pub fn with_particulate_timeout_rate(mut self, rate: f64) -> Self {
        self.particulate_timeout_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Read the proxy temperature from a thermal zone instead of simulating it.
    pub fn with_proxy(mut self, zone: ThermalZone) -> Self {
        self.proxy = Some(zone);
        self
    }

    fn check_present(&self, capability: Capability) -> Result<(), SensorError> {
        if self.missing.contains(&capability) {
            Err(SensorError::Unavailable(capability))
        } else {
            Ok(())
        }
    }

    fn noise(&mut self, amplitude: f64) -> f64 {
        self.rng.random_range(-amplitude..=amplitude)
    }
}

impl SensorPort for SimulatedPort {
    fn probe(&mut self, capability: Capability) -> Result<(), SensorError> {
        self.check_present(capability)
    }

    fn read_temperature_and_proxy(&mut self) -> Result<TemperatureReading, SensorError> {
        self.check_present(Capability::Temperature)?;
        let phase = TAU * (self.step as f64 / DAY_STEPS);
        self.step += 1;

        // Sensor sits on a warm board, so it reads above ambient.
        let ambient = 22.0 + 5.0 * phase.sin();
        let raw = ambient + 3.0 + self.noise(0.2);
        let board_offset = 12.0 + self.noise(0.5);
        let proxy = match &self.proxy {
            Some(zone) => zone.read_celsius().ok(),
            None => Some(raw + board_offset),
        };
        Ok(TemperatureReading { raw, proxy })
    }

    fn read_pressure(&mut self) -> Result<f64, SensorError> {
        self.check_present(Capability::Pressure)?;
        Ok(1013.25 + self.noise(1.5))
    }

    fn read_humidity(&mut self) -> Result<f64, SensorError> {
        self.check_present(Capability::Humidity)?;
        Ok((45.0 + self.noise(8.0)).clamp(0.0, 100.0))
    }

    fn read_gas(&mut self) -> Result<GasReading, SensorError> {
        self.check_present(Capability::Gas)?;
        Ok(GasReading {
            oxidised: 35_000.0 + self.noise(10_000.0),
            reducing: 350_000.0 + self.noise(100_000.0),
            nh3: 100_000.0 + self.noise(40_000.0),
        })
    }

    fn read_light(&mut self) -> Result<LightReading, SensorError> {
        self.check_present(Capability::Light)?;
        Ok(LightReading {
            lux: (300.0 + self.noise(250.0)).max(0.0),
            proximity: self.rng.random_range(0.0..=20.0_f64).floor(),
        })
    }

    fn read_particulates(&mut self) -> Result<ParticulateReading, SensorError> {
        self.check_present(Capability::Particulates)?;
        if self.particulate_timeout_rate > 0.0 && self.rng.random_bool(self.particulate_timeout_rate) {
            return Err(SensorError::Timeout(Capability::Particulates));
        }

        let pm1 = (4.0 + self.noise(2.0)).max(0.0);
        let pm2_5 = pm1 + (3.0 + self.noise(1.5)).max(0.0);
        let pm10 = pm2_5 + (4.0 + self.noise(2.0)).max(0.0);
        let base = 600.0 + self.noise(200.0);
        let counts = [
            base,
            base * 0.3,
            base * 0.07,
            base * 0.008,
            base * 0.002,
            base * 0.0005,
        ]
        .map(|c: f64| c.max(0.0).round());

        Ok(ParticulateReading {
            pm1,
            pm2_5,
            pm10,
            counts,
        })
    }
}
