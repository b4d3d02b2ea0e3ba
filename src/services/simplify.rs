// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Douglas-Peucker path simplification for recorded trajectories.

use crate::models::TrajectoryPoint;
use crate::services::geo_math::perpendicular_distance;

/// Default tolerance in coordinate degrees (~5 m).
pub const DEFAULT_TOLERANCE_DEG: f64 = 0.00005;

/// Result of simplifying a trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplifiedPath {
    pub points: Vec<TrajectoryPoint>,
    pub original_count: usize,
}

impl SimplifiedPath {
    /// Fraction of points removed: `(original - simplified) / original`.
    pub fn reduction_ratio(&self) -> f64 {
        if self.original_count == 0 {
            return 0.0;
        }
        (self.original_count - self.points.len()) as f64 / self.original_count as f64
    }
}

/// Simplify a trajectory, keeping points that deviate more than `tolerance`
/// from the chord of their enclosing range.
///
/// Point order is preserved and the first and last points are always kept.
/// Inputs with fewer than 3 points are returned unchanged.
pub fn simplify_path(points: &[TrajectoryPoint], tolerance: f64) -> SimplifiedPath {
    let points_out = simplify_indices(points, tolerance)
        .into_iter()
        .map(|i| points[i])
        .collect();

    SimplifiedPath {
        points: points_out,
        original_count: points.len(),
    }
}

/// Indices of the points kept by Douglas-Peucker, in ascending order.
pub fn simplify_indices(points: &[TrajectoryPoint], tolerance: f64) -> Vec<usize> {
    let n = points.len();
    if n < 3 {
        return (0..n).collect();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    // Explicit stack of (start, end) ranges.
    let mut ranges = vec![(0usize, n - 1)];
    while let Some((start, end)) = ranges.pop() {
        if end <= start + 1 {
            continue;
        }

        let first = points[start].coordinate();
        let last = points[end].coordinate();

        let mut max_distance = 0.0;
        let mut max_index = start;
        for (i, p) in points.iter().enumerate().take(end).skip(start + 1) {
            let d = perpendicular_distance(p.coordinate(), first, last);
            if d > max_distance {
                max_distance = d;
                max_index = i;
            }
        }

        if max_distance > tolerance {
            keep[max_index] = true;
            ranges.push((max_index, end));
            ranges.push((start, max_index));
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect()
}
