// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GeoJSON and polyline export of stored routes.

use crate::models::{Coordinate, StoredRoute};
use geo::{Coord, LineString};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject};
use serde_json::json;

/// Errors from route export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to decode polyline: {0}")]
    PolylineError(String),
}

/// Decode a stored route's polyline (precision 5).
pub fn decode_route_polyline(encoded: &str) -> Result<LineString<f64>, ExportError> {
    polyline::decode_polyline(encoded, 5).map_err(|e| ExportError::PolylineError(e.to_string()))
}

/// Build a FeatureCollection for a stored route.
///
/// Features, in order: the simplified trajectory as a LineString, the start
/// and end points, then one Point per checkpoint in stop order.
pub fn route_to_geojson(stored: &StoredRoute) -> GeoJson {
    let route = &stored.route;
    let mut features = Vec::with_capacity(route.checkpoints.len() + 3);

    let line: LineString<f64> = route
        .simplified_trajectory
        .iter()
        .map(|p| Coord::from(p.coordinate()))
        .collect();
    features.push(feature(
        geojson::Value::from(&line),
        [
            ("kind", json!("trajectory")),
            ("route_id", json!(stored.id)),
            ("vehicle_id", json!(route.vehicle_id)),
            ("status", json!(stored.status)),
            ("total_distance_km", json!(route.total_distance_km)),
            ("recorded_at_ms", json!(route.recorded_at_ms)),
            ("point_count", json!(route.simplified_trajectory.len())),
        ],
    ));

    features.push(feature(point(route.start_point), [("kind", json!("start"))]));
    features.push(feature(point(route.end_point), [("kind", json!("end"))]));

    let mut stops = route.checkpoints.clone();
    stops.sort_by_key(|s| s.order);
    for stop in stops {
        features.push(feature(
            point(Coordinate::new(stop.latitude, stop.longitude)),
            [
                ("kind", json!("checkpoint")),
                ("id", json!(stop.id)),
                ("name", json!(stop.name)),
                ("order", json!(stop.order)),
            ],
        ));
    }

    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn point(c: Coordinate) -> geojson::Value {
    geojson::Value::Point(vec![c.longitude, c.latitude])
}

fn feature<const N: usize>(value: geojson::Value, props: [(&str, serde_json::Value); N]) -> Feature {
    let properties: JsonObject = props
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
