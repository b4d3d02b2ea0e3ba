// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Great-circle and planar distance helpers.

use crate::models::Coordinate;

/// Mean Earth radius used for all route distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Chord length below which a line is treated as a single point (degrees).
const DEGENERATE_LINE_EPSILON: f64 = 1e-8;

/// Haversine distance between two WGS84 positions, in kilometers.
pub fn haversine_distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    if lat1 == lat2 && lon1 == lon2 {
        return 0.0;
    }

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    // Rounding can push `a` slightly outside [0, 1] near antipodes.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Haversine distance between two coordinates, in kilometers.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    haversine_distance_km(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Distance from `point` to the line through `line_start` and `line_end`.
///
/// Treats latitude/longitude as planar Cartesian coordinates, so the result
/// is in degrees and only meaningful for comparison against a tolerance in
/// the same units. Returns 0 when the two line points coincide.
pub fn perpendicular_distance(point: Coordinate, line_start: Coordinate, line_end: Coordinate) -> f64 {
    let dx = line_end.latitude - line_start.latitude;
    let dy = line_end.longitude - line_start.longitude;
    let mag = (dx * dx + dy * dy).sqrt();
    if mag < DEGENERATE_LINE_EPSILON {
        return 0.0;
    }

    let u = ((point.latitude - line_start.latitude) * dx
        + (point.longitude - line_start.longitude) * dy)
        / (mag * mag);
    let foot_lat = line_start.latitude + u * dx;
    let foot_lon = line_start.longitude + u * dy;

    let pdx = point.latitude - foot_lat;
    let pdy = point.longitude - foot_lon;
    (pdx * pdx + pdy * pdy).sqrt()
}
