//! Aligned batch windows.
//!
//! Readings accumulate until a tick at or past the current boundary; that
//! tick's reading is appended first, then the whole batch is closed. The next
//! boundary is the previous one plus the window duration, never derived from
//! the tick time, so sleep jitter cannot accumulate into drift.
//!
//! ```text
//! alignment 60s, duration 60s, start 12:00:07
//!
//!   12:00:07 ─────── 12:01:00 ─────── 12:02:00 ─────── 12:03:00
//!   |  first (53s)   |   60s          |   60s          |
//! ```

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use es_common::Reading;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("{0} must be at least one second")]
    NonPositive(&'static str),

    #[error("batch duration {duration}s is not a multiple of alignment {alignment}s")]
    NotMultiple { duration: i64, alignment: i64 },

    #[error("window boundary after {from} is outside the representable time range")]
    OutOfRange { from: DateTime<Utc> },
}

/// A batch handed over when its window closes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedWindow {
    pub boundary: DateTime<Utc>,
    pub readings: Vec<Reading>,
    /// Whole windows skipped because the clock was already past the next boundary.
    pub skipped: u64,
}

/// Window state: the open batch and its closing boundary.
#[derive(Debug, Clone)]
pub struct WindowScheduler {
    duration: chrono::Duration,
    alignment: chrono::Duration,
    boundary: DateTime<Utc>,
    batch: Vec<Reading>,
}

impl WindowScheduler {
    /// Start accumulating at `now`.
    ///
    /// Both durations are whole seconds; `duration` must be a multiple of
    /// `alignment`.
    pub fn new(
        duration: Duration,
        alignment: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self, WindowError> {
        let duration_secs = whole_secs(duration, "batch duration")?;
        let alignment_secs = whole_secs(alignment, "alignment")?;
        if duration_secs % alignment_secs != 0 {
            return Err(WindowError::NotMultiple {
                duration: duration_secs,
                alignment: alignment_secs,
            });
        }

        let duration = seconds(duration_secs, now)?;
        let alignment = seconds(alignment_secs, now)?;
        Ok(Self {
            duration,
            alignment,
            boundary: first_boundary(now, duration, alignment)?,
            batch: Vec::new(),
        })
    }

    /// Boundary the open window closes at.
    pub fn boundary(&self) -> DateTime<Utc> {
        self.boundary
    }

    /// Readings in the open window.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Append a reading and close the window if `now` has reached the boundary.
    pub fn push(&mut self, reading: Reading, now: DateTime<Utc>) -> Option<ClosedWindow> {
        self.batch.push(reading);
        if now < self.boundary {
            return None;
        }

        let closed = self.boundary;
        let (next, skipped) = match self.next_boundary(closed, now) {
            Ok(advance) => advance,
            Err(e) => {
                // Nothing later is representable; the open window never closes.
                error!(closed = %closed, error = %e, "cannot schedule next window");
                (DateTime::<Utc>::MAX_UTC, 0)
            }
        };
        if skipped > 0 {
            warn!(
                closed = %closed,
                next = %next,
                skipped,
                "clock passed later boundaries, skipping windows"
            );
        }
        self.boundary = next;

        Some(ClosedWindow {
            boundary: closed,
            readings: std::mem::take(&mut self.batch),
            skipped,
        })
    }

    /// Boundary after `closed`, and how many windows `now` has already passed.
    fn next_boundary(
        &self,
        closed: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, u64), WindowError> {
        let next = closed
            .checked_add_signed(self.duration)
            .and_then(|t| snap_up(t, self.alignment))
            .ok_or(WindowError::OutOfRange { from: closed })?;
        if now < next {
            return Ok((next, 0));
        }

        let duration_secs = self.duration.num_seconds();
        let steps = (now - next).num_seconds() / duration_secs + 1;
        let advanced = duration_secs
            .checked_mul(steps)
            .and_then(TimeDelta::try_seconds)
            .and_then(|delta| next.checked_add_signed(delta))
            .ok_or(WindowError::OutOfRange { from: next })?;
        Ok((advanced, steps as u64))
    }

    /// How long to sleep before the next tick: the read interval, cut short
    /// so the loop wakes at the boundary.
    pub fn sleep_hint(&self, now: DateTime<Utc>, read_interval: Duration) -> Duration {
        let remaining = (self.boundary - now).to_std().unwrap_or(Duration::ZERO);
        remaining.min(read_interval)
    }

    /// Drop the open window, returning how many readings it held.
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.batch.len();
        self.batch.clear();
        dropped
    }
}

fn whole_secs(d: Duration, what: &'static str) -> Result<i64, WindowError> {
    match i64::try_from(d.as_secs()) {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(WindowError::NonPositive(what)),
    }
}

fn seconds(secs: i64, at: DateTime<Utc>) -> Result<TimeDelta, WindowError> {
    TimeDelta::try_seconds(secs)
        .filter(|delta| at.checked_add_signed(*delta).is_some())
        .ok_or(WindowError::OutOfRange { from: at })
}

fn on_grid(t: DateTime<Utc>, alignment: chrono::Duration) -> bool {
    t.timestamp_subsec_nanos() == 0 && t.timestamp().rem_euclid(alignment.num_seconds()) == 0
}

/// Smallest grid instant at or after `t`, if representable.
fn snap_up(t: DateTime<Utc>, alignment: chrono::Duration) -> Option<DateTime<Utc>> {
    if on_grid(t, alignment) {
        return Some(t);
    }
    let secs = alignment.num_seconds();
    let floor = t.timestamp().div_euclid(secs) * secs;
    DateTime::from_timestamp(floor.checked_add(secs)?, 0)
}

/// First boundary for a scheduler started at `now`.
///
/// The next grid instant after `now`; when `now` sits exactly on the grid the
/// first window runs a full duration instead of closing immediately.
pub fn first_boundary(
    now: DateTime<Utc>,
    duration: chrono::Duration,
    alignment: chrono::Duration,
) -> Result<DateTime<Utc>, WindowError> {
    let boundary = if on_grid(now, alignment) {
        now.checked_add_signed(duration)
    } else {
        snap_up(now, alignment)
    };
    boundary.ok_or(WindowError::OutOfRange { from: now })
}
