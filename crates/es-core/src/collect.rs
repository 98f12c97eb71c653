//! The collection loop.
//!
//! One tick: sample, hand the reading to the window scheduler, and write the
//! closed window if there is one. Everything runs on the calling thread; a
//! write always finishes before the next sample is taken.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use es_common::{Reading, StationId};
use es_telemetry::{PartitionedWriter, WriteError};
use serde::Serialize;
use tracing::{error, info};

use crate::clock::Clock;
use crate::sample::Sampler;
use crate::sensors::{Capability, SensorPort};
use crate::window::{ClosedWindow, WindowError, WindowScheduler};

/// Destination of closed windows.
pub trait BatchSink {
    fn write_window(
        &mut self,
        readings: &[Reading],
        boundary: DateTime<Utc>,
        station: &StationId,
    ) -> Result<PathBuf, WriteError>;
}

impl BatchSink for PartitionedWriter {
    fn write_window(
        &mut self,
        readings: &[Reading],
        boundary: DateTime<Utc>,
        station: &StationId,
    ) -> Result<PathBuf, WriteError> {
        self.write(readings, boundary, station)
    }
}

impl<S: BatchSink + ?Sized> BatchSink for &mut S {
    fn write_window(
        &mut self,
        readings: &[Reading],
        boundary: DateTime<Utc>,
        station: &StationId,
    ) -> Result<PathBuf, WriteError> {
        (**self).write_window(readings, boundary, station)
    }
}

/// What happened on one tick.
#[derive(Debug)]
pub enum TickOutcome {
    Accumulated,
    Written { boundary: DateTime<Utc>, path: PathBuf, rows: usize },
    WriteFailed { boundary: DateTime<Utc>, rows: usize },
}

/// Counters reported when collection stops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectorStats {
    pub ticks: u64,
    pub windows_written: u64,
    pub rows_written: u64,
    pub write_failures: u64,
    pub windows_skipped: u64,
    /// Readings of the open window dropped at shutdown.
    pub dropped_on_stop: usize,
    pub capability_failures: BTreeMap<Capability, u64>,
}

pub struct Collector<P, S, C> {
    sampler: Sampler<P>,
    scheduler: WindowScheduler,
    sink: S,
    clock: C,
    station: StationId,
    read_interval: Duration,
    stats: CollectorStats,
}

impl<P: SensorPort, S: BatchSink, C: Clock> Collector<P, S, C> {
    /// Build a collector whose first window starts at `clock.now()`.
    pub fn new(
        sampler: Sampler<P>,
        sink: S,
        clock: C,
        station: StationId,
        read_interval: Duration,
        batch_duration: Duration,
        alignment: Duration,
    ) -> Result<Self, WindowError> {
        let scheduler = WindowScheduler::new(batch_duration, alignment, clock.now())?;
        info!(
            station = %station,
            first_boundary = %scheduler.boundary(),
            read_interval_ms = read_interval.as_millis() as u64,
            "collector started"
        );
        Ok(Self {
            sampler,
            scheduler,
            sink,
            clock,
            station,
            read_interval,
            stats: CollectorStats::default(),
        })
    }

    pub fn scheduler(&self) -> &WindowScheduler {
        &self.scheduler
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn stats(&self) -> CollectorStats {
        CollectorStats {
            capability_failures: self.sampler.stats().capability_failures.clone(),
            ..self.stats.clone()
        }
    }

    /// Sample once and flush if the window closed.
    pub fn tick(&mut self) -> TickOutcome {
        let now = self.clock.now();
        let reading = self.sampler.sample(now);
        self.stats.ticks += 1;

        match self.scheduler.push(reading, now) {
            Some(window) => self.flush(window),
            None => TickOutcome::Accumulated,
        }
    }

    fn flush(&mut self, window: ClosedWindow) -> TickOutcome {
        self.stats.windows_skipped += window.skipped;
        let rows = window.readings.len();
        let boundary = window.boundary;

        match self.sink.write_window(&window.readings, boundary, &self.station) {
            Ok(path) => {
                self.stats.windows_written += 1;
                self.stats.rows_written += rows as u64;
                TickOutcome::Written {
                    boundary,
                    path,
                    rows,
                }
            }
            Err(e) => {
                // The window is lost; collection carries on with the next one.
                self.stats.write_failures += 1;
                error!(
                    boundary = %boundary,
                    rows,
                    failures = self.stats.write_failures,
                    error = %e,
                    "window write failed"
                );
                TickOutcome::WriteFailed { boundary, rows }
            }
        }
    }

    /// Tick until `stop` is set or `max_ticks` ticks have run.
    ///
    /// The open window is dropped on exit; no file is written for it.
    pub fn run(&mut self, stop: &AtomicBool, max_ticks: Option<u64>) -> CollectorStats {
        let mut ticks = 0u64;
        while !stop.load(Ordering::SeqCst) {
            self.tick();
            ticks += 1;
            if max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }

            let pause = self.scheduler.sleep_hint(self.clock.now(), self.read_interval);
            if !pause.is_zero() {
                self.clock.sleep(pause);
            }
        }

        self.stats.dropped_on_stop = self.scheduler.discard_pending();
        let stats = self.stats();
        info!(
            ticks = stats.ticks,
            windows_written = stats.windows_written,
            rows_written = stats.rows_written,
            write_failures = stats.write_failures,
            windows_skipped = stats.windows_skipped,
            dropped_partial = stats.dropped_on_stop,
            capability_failures = ?stats.capability_failures,
            "collection stopped"
        );
        stats
    }
}
