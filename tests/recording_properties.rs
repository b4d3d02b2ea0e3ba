// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Property checks over the recording pipeline with generated inputs.

use bus_route_recorder::models::checkpoint::remove_and_renumber;
use bus_route_recorder::models::{CheckpointStop, Coordinate, GpsFix, QualityTier, TrajectoryPoint};
use bus_route_recorder::services::gate::{GateDecision, SampleGate};
use bus_route_recorder::services::geo_math::distance_km;
use bus_route_recorder::services::simplify::simplify_path;

/// Small deterministic generator so failures are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn random_walk(seed: u64, len: usize) -> Vec<TrajectoryPoint> {
    let mut rng = Lcg(seed);
    let (mut lat, mut lon) = (12.9716, 77.5946);
    (0..len)
        .map(|i| {
            lat += (rng.next_f64() - 0.3) * 0.0005;
            lon += (rng.next_f64() - 0.5) * 0.0005;
            TrajectoryPoint {
                latitude: lat,
                longitude: lon,
                timestamp_ms: i as i64 * 5_000,
                accuracy_m: 5.0 + rng.next_f64() * 20.0,
                speed_mps: None,
                heading_deg: None,
                altitude_m: None,
            }
        })
        .collect()
}

#[test]
fn test_tier_is_monotonic_in_accuracy() {
    let mut prev = QualityTier::from_accuracy(0.0);
    for step in 0..2_000 {
        let tier = QualityTier::from_accuracy(step as f64 * 0.05);
        assert!(tier >= prev, "tier regressed at {} m", step as f64 * 0.05);
        prev = tier;
    }
    assert_eq!(prev, QualityTier::Poor);
}

#[test]
fn test_simplification_keeps_endpoints() {
    for seed in 1..20 {
        let path = random_walk(seed, 50);
        for tolerance in [0.0, 0.00001, 0.00005, 0.0005, 0.01, 1.0] {
            let simplified = simplify_path(&path, tolerance).points;
            assert_eq!(simplified.first(), path.first());
            assert_eq!(simplified.last(), path.last());
        }
    }
}

#[test]
fn test_simplification_is_ordered_subsequence() {
    let path = random_walk(7, 80);
    let simplified = simplify_path(&path, 0.0001).points;

    let mut cursor = path.iter();
    for point in &simplified {
        assert!(cursor.any(|p| p == point), "output is not a subsequence of input");
    }
}

#[test]
fn test_simplification_non_increasing_in_tolerance() {
    for seed in 1..20 {
        let path = random_walk(seed, 60);
        let mut prev = usize::MAX;
        for tolerance in [0.0, 0.000005, 0.00002, 0.00005, 0.0001, 0.0005, 0.002, 0.1] {
            let count = simplify_path(&path, tolerance).points.len();
            assert!(count <= prev, "seed {} eps {} grew to {}", seed, tolerance, count);
            prev = count;
        }
        assert_eq!(prev, 2);
    }
}

#[test]
fn test_checkpoint_removal_keeps_sequence() {
    for n in 1..8u32 {
        for k in 1..=n {
            let mut stops: Vec<CheckpointStop> = (1..=n)
                .map(|order| CheckpointStop {
                    id: format!("stop-{}", order),
                    name: format!("Stop {}", order),
                    latitude: 12.97,
                    longitude: 77.59,
                    order,
                    timestamp_ms: order as i64,
                })
                .collect();

            let removed = remove_and_renumber(&mut stops, &format!("stop-{}", k)).unwrap();
            assert_eq!(removed.order, k);

            let orders: Vec<u32> = stops.iter().map(|s| s.order).collect();
            assert_eq!(orders, (1..n).collect::<Vec<_>>());

            let ids: Vec<String> = stops.iter().map(|s| s.id.clone()).collect();
            let expected: Vec<String> = (1..=n)
                .filter(|&o| o != k)
                .map(|o| format!("stop-{}", o))
                .collect();
            assert_eq!(ids, expected);
        }
    }
}

#[test]
fn test_distance_accumulates_over_collinear_points() {
    // Fair-tier fixes pass through the filter unsmoothed
    let step = 0.001;
    let fixes: Vec<GpsFix> = (0..3)
        .map(|i| GpsFix::new(10.0 + step * i as f64, 78.0, 40.0, i * 6_000))
        .collect();
    let d = distance_km(fixes[0].coordinate(), fixes[1].coordinate());

    let mut gate = SampleGate::new();
    let mut total = 0.0;
    for fix in &fixes {
        match gate.evaluate(fix) {
            GateDecision::First { .. } => {}
            GateDecision::Accepted { distance_km, .. } => total += distance_km,
            other => panic!("unexpected decision {:?}", other),
        }
    }
    assert!((total - 2.0 * d).abs() < 1e-9, "total {} vs 2d {}", total, 2.0 * d);
}

#[test]
fn test_first_fix_seeds_even_when_unknown_accuracy() {
    let mut gate = SampleGate::new();
    let decision = gate.evaluate(&GpsFix::new(10.0, 78.0, 999.0, 0));
    assert!(decision.records_point());
    assert_eq!(gate.last_accepted(), Some(Coordinate::new(10.0, 78.0)));
}
