//! End-to-end collection scenarios on a manual clock.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use es_common::{Reading, StationId};
use es_config::FilenameScheme;
use es_core::sensors::{
    GasReading, LightReading, ParticulateReading, TemperatureReading,
};
use es_core::{
    BatchSink, Capability, CapabilitySet, Collector, CompensationFilter, ManualClock, Sampler,
    SensorError, SensorPort, SimulatedPort,
};
use es_telemetry::{list_partition_files, read_readings, PartitionedWriter, WriteError, WriterConfig};
use tempfile::tempdir;

fn station() -> StationId {
    StationId::parse("01").unwrap()
}

/// Constant readings; the n-th particulate read (1-based) times out.
struct ScriptedPort {
    particulate_reads: u32,
    timeout_on: u32,
}

impl SensorPort for ScriptedPort {
    fn probe(&mut self, _capability: Capability) -> Result<(), SensorError> {
        Ok(())
    }
    fn read_temperature_and_proxy(&mut self) -> Result<TemperatureReading, SensorError> {
        Ok(TemperatureReading {
            raw: 24.0,
            proxy: Some(36.0),
        })
    }
    fn read_pressure(&mut self) -> Result<f64, SensorError> {
        Ok(1012.0)
    }
    fn read_humidity(&mut self) -> Result<f64, SensorError> {
        Ok(44.0)
    }
    fn read_gas(&mut self) -> Result<GasReading, SensorError> {
        Ok(GasReading {
            oxidised: 30_000.0,
            reducing: 300_000.0,
            nh3: 90_000.0,
        })
    }
    fn read_light(&mut self) -> Result<LightReading, SensorError> {
        Ok(LightReading {
            lux: 120.0,
            proximity: 3.0,
        })
    }
    fn read_particulates(&mut self) -> Result<ParticulateReading, SensorError> {
        self.particulate_reads += 1;
        if self.particulate_reads == self.timeout_on {
            return Err(SensorError::Timeout(Capability::Particulates));
        }
        Ok(ParticulateReading {
            pm1: 3.0,
            pm2_5: 5.0,
            pm10: 7.0,
            counts: [500.0, 150.0, 30.0, 3.0, 1.0, 0.0],
        })
    }
}

#[derive(Default)]
struct RecordingSink {
    windows: Vec<(DateTime<Utc>, Vec<Reading>)>,
}

impl BatchSink for RecordingSink {
    fn write_window(
        &mut self,
        readings: &[Reading],
        boundary: DateTime<Utc>,
        _station: &StationId,
    ) -> Result<PathBuf, WriteError> {
        self.windows.push((boundary, readings.to_vec()));
        Ok(PathBuf::from("memory"))
    }
}

#[test]
fn particulate_timeout_on_fourth_tick_nulls_only_that_record() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 1).unwrap());
    let sampler = Sampler::new(
        ScriptedPort {
            particulate_reads: 0,
            timeout_on: 4,
        },
        CapabilitySet::all_enabled(),
        CompensationFilter::new(2.25, 40.0),
        30.0626,
        31.4916,
    );
    let mut collector = Collector::new(
        sampler,
        RecordingSink::default(),
        &clock,
        station(),
        Duration::from_secs(1),
        Duration::from_secs(5),
        Duration::from_secs(5),
    )
    .unwrap();

    // 12:00:01 .. 12:00:05
    let stats = collector.run(&AtomicBool::new(false), Some(5));
    assert_eq!(stats.windows_written, 1);
    assert_eq!(stats.capability_failures.get(&Capability::Particulates), Some(&1));

    let (boundary, readings) = &collector.sink().windows[0];
    assert_eq!(*boundary, Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 5).unwrap());
    assert_eq!(readings.len(), 5);
    for (i, r) in readings.iter().enumerate() {
        let expect_null = i == 3;
        assert_eq!(r.pm1.is_none(), expect_null, "record {i}");
        assert_eq!(r.pm2_5.is_none(), expect_null, "record {i}");
        assert_eq!(r.pm10.is_none(), expect_null, "record {i}");
        assert_eq!(r.particles_03um.is_none(), expect_null, "record {i}");
        assert_eq!(r.particles_100um.is_none(), expect_null, "record {i}");
        assert_eq!(r.humidity, Some(44.0));
        assert_eq!(r.oxidised, Some(30.0));
        // constant proxy: converged from the first call
        let expected = 24.0 - (36.0 - 24.0) / 2.25;
        assert!((r.temperature.unwrap() - expected).abs() < 1e-9);
    }
}

#[test]
fn minute_windows_from_mid_minute_start_land_on_disk() {
    let dir = tempdir().unwrap();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 7).unwrap())
        .with_jitter(Duration::from_millis(3));
    let sampler = Sampler::new(
        SimulatedPort::new(7),
        CapabilitySet::all_enabled(),
        CompensationFilter::new(2.25, 40.0),
        30.0626,
        31.4916,
    );
    let writer = PartitionedWriter::new(
        WriterConfig::new(dir.path()).with_filename_scheme(FilenameScheme::Minute),
    );
    let mut collector = Collector::new(
        sampler,
        writer,
        &clock,
        station(),
        Duration::from_secs(1),
        Duration::from_secs(60),
        Duration::from_secs(60),
    )
    .unwrap();

    let stats = collector.run(&AtomicBool::new(false), Some(200));
    assert_eq!(stats.windows_written, 3);
    assert_eq!(stats.write_failures, 0);
    assert_eq!(stats.rows_written as usize + stats.dropped_on_stop, 200);

    let partition = dir.path().join("station=01/year=2026/month=10/day=18");
    let files = list_partition_files(&partition).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["data_1201.parquet", "data_1202.parquet", "data_1203.parquet"]
    );

    // First window: 12:00:07 up to and including the tick at 12:01:00.
    let first = read_readings(&files[0]).unwrap();
    assert_eq!(
        first.first().unwrap().timestamp,
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 7).unwrap()
    );
    assert_eq!(
        first.last().unwrap().timestamp,
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 1, 0).unwrap()
    );

    let total: usize = files.iter().map(|f| read_readings(f).unwrap().len()).sum();
    assert_eq!(total as u64, stats.rows_written);
}
