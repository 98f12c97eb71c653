//! Enviro Station common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the station crates:
//! - Station identity usable as a partition path segment
//! - The `Reading` record and its numeric column table
//! - Common error types
//! - File schema versioning

pub mod error;
pub mod id;
pub mod reading;
pub mod schema;

pub use error::{Error, Result};
pub use id::StationId;
pub use reading::{NumericField, Reading, NUMERIC_FIELDS, PARTICLE_BUCKETS_UM};
pub use schema::SCHEMA_VERSION;
