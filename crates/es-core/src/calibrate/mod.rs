//! Reading calibration.

pub mod compensation;

pub use compensation::{CompensationFilter, SMOOTHING_WINDOW};
