//! Enviro Station collector.
//!
//! This crate provides:
//! - The sensor capability interface and its simulated backend
//! - Ambient temperature compensation
//! - The per-tick sampler
//! - Drift-free, grid-aligned batch windows
//! - The single-threaded collection loop
//! - Logging setup, shutdown signal handling and exit codes for the binary

pub mod calibrate;
pub mod clock;
pub mod collect;
pub mod exit_codes;
pub mod logging;
pub mod sample;
pub mod sensors;
pub mod shutdown;
pub mod window;

pub use calibrate::CompensationFilter;
pub use clock::{Clock, ManualClock, SystemClock};
pub use collect::{BatchSink, Collector, CollectorStats, TickOutcome};
pub use exit_codes::ExitCode;
pub use sample::{Sampler, SamplerStats};
pub use sensors::{
    Capability, CapabilitySet, CapabilityState, SensorError, SensorPort, SimulatedPort,
    ThermalZone,
};
pub use window::{first_boundary, ClosedWindow, WindowError, WindowScheduler};
