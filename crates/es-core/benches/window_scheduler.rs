//! Criterion benchmarks for the per-tick collection path.
//!
//! Uses the simulated port and an in-memory clock so results do not depend
//! on hardware or wall time.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use es_common::Reading;
use es_core::{CapabilitySet, CompensationFilter, Sampler, SimulatedPort, WindowScheduler};

fn bench_scheduler_push(c: &mut Criterion) {
    let start = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 7).unwrap();

    c.bench_function("scheduler_push_one_day_1s_ticks", |b| {
        b.iter(|| {
            let mut scheduler =
                WindowScheduler::new(Duration::from_secs(300), Duration::from_secs(300), start)
                    .unwrap();
            let mut windows = 0usize;
            for i in 0..86_400i64 {
                let now = start + chrono::Duration::seconds(i);
                if scheduler.push(Reading::new(now, 0.0, 0.0), now).is_some() {
                    windows += 1;
                }
            }
            black_box(windows)
        })
    });
}

fn bench_sampler(c: &mut Criterion) {
    let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 7).unwrap();
    let mut sampler = Sampler::new(
        SimulatedPort::new(7),
        CapabilitySet::all_enabled(),
        CompensationFilter::new(2.25, 40.0),
        30.0626,
        31.4916,
    );

    c.bench_function("sampler_sample_all_capabilities", |b| {
        b.iter(|| black_box(sampler.sample(black_box(now))))
    });
}

criterion_group!(benches, bench_scheduler_push, bench_sampler);
criterion_main!(benches);
