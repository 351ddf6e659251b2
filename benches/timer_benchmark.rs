//! Timer benchmark: Measure one firing pass over a full table.
//!
//! Target: < 1µs per pass with every slot occupied

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glue::timer::Deadline;
use glue::{Timer, TimerRegistry};

const MS: u64 = 1_000_000;
const FOREVER: u64 = 86_400_000_000_000;

fn full_registry() -> TimerRegistry {
    let mut timers = TimerRegistry::new(32, FOREVER, Deadline::new(FOREVER));
    timers.set_running(true);
    for i in 1..32u64 {
        timers
            .add(Timer::from_nanos(i * MS, |_, _| {}))
            .expect("table has room");
    }
    timers
}

fn fire_due_full_table(c: &mut Criterion) {
    let mut timers = full_registry();
    let mut now = MS;
    timers.fire_due(now);

    c.bench_function("fire_due_31_timers", |b| {
        b.iter(|| {
            now += MS;
            black_box(timers.fire_due(black_box(now)))
        })
    });
}

fn fire_due_nothing_due(c: &mut Criterion) {
    let mut timers = full_registry();
    timers.fire_due(MS);

    c.bench_function("fire_due_idle", |b| {
        b.iter(|| black_box(timers.fire_due(black_box(MS + 1))))
    });
}

fn add_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_remove");
    for occupied in [0usize, 16, 30] {
        let mut timers = TimerRegistry::new(32, FOREVER, Deadline::new(FOREVER));
        timers.set_running(true);
        for _ in 0..occupied {
            timers
                .add(Timer::from_nanos(10 * MS, |_, _| {}))
                .expect("table has room");
        }
        group.bench_with_input(BenchmarkId::from_parameter(occupied), &occupied, |b, _| {
            b.iter(|| {
                let id = timers
                    .add(Timer::from_nanos(MS, |_, _| {}))
                    .expect("table has room");
                timers.remove(black_box(id));
            })
        });
    }
    group.finish();
}

criterion_group!(benches, fire_due_full_table, fire_due_nothing_due, add_remove);
criterion_main!(benches);
