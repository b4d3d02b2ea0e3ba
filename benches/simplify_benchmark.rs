use bus_route_recorder::models::{GpsFix, TrajectoryPoint};
use bus_route_recorder::services::gate::SampleGate;
use bus_route_recorder::services::simplify::{simplify_path, DEFAULT_TOLERANCE_DEG};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

/// A wiggly city route: one fix every 5 s heading roughly north-east.
fn synthetic_fixes(len: usize) -> Vec<GpsFix> {
    (0..len)
        .map(|i| {
            let t = i as f64;
            GpsFix::new(
                12.9716 + t * 0.0002 + (t * 0.7).sin() * 0.00005,
                77.5946 + t * 0.0001 + (t * 0.3).cos() * 0.00005,
                5.0 + (t * 1.3).sin().abs() * 25.0,
                i as i64 * 5_000,
            )
        })
        .collect()
}

fn synthetic_trajectory(len: usize) -> Vec<TrajectoryPoint> {
    synthetic_fixes(len)
        .iter()
        .map(|f| TrajectoryPoint::from_fix(f, f.coordinate()))
        .collect()
}

fn benchmark_simplify(c: &mut Criterion) {
    let mut group = c.benchmark_group("simplify_path");

    // A one-hour trip at 5 s cadence is ~720 points
    for len in [720, 5_000] {
        let trajectory = synthetic_trajectory(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &trajectory, |b, t| {
            b.iter(|| simplify_path(black_box(t), DEFAULT_TOLERANCE_DEG))
        });
    }

    group.finish();
}

fn benchmark_gate(c: &mut Criterion) {
    let fixes = synthetic_fixes(720);

    c.bench_function("gate_one_hour_of_fixes", |b| {
        b.iter(|| {
            let mut gate = SampleGate::new();
            let mut recorded = 0usize;
            for fix in &fixes {
                if gate.evaluate(black_box(fix)).records_point() {
                    recorded += 1;
                }
            }
            recorded
        })
    });
}

criterion_group!(benches, benchmark_simplify, benchmark_gate);
criterion_main!(benches);
