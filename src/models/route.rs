// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recorded route payload and its stored form.

use crate::models::{CheckpointStop, Coordinate, TrajectoryPoint};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Summary statistics computed when a recording is stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RouteSummary {
    pub raw_point_count: usize,
    pub simplified_point_count: usize,
    /// Fraction of points removed by simplification (0.0 - 1.0)
    pub reduction_ratio: f64,
    pub average_accuracy_m: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub duration_ms: i64,
    pub battery_optimized: bool,
}

/// The payload handed to the route store when a recording is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecordedRoute {
    pub vehicle_id: String,
    pub operator_id: String,
    pub start_point: Coordinate,
    pub end_point: Coordinate,
    pub simplified_trajectory: Vec<TrajectoryPoint>,
    pub checkpoints: Vec<CheckpointStop>,
    pub total_distance_km: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub recorded_at_ms: i64,
    /// Google encoded polyline (precision 5) of the simplified trajectory
    pub encoded_polyline: String,
    pub summary: RouteSummary,
}

/// Review status of a stored route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum RouteStatus {
    Pending,
    Approved,
    Active,
}

/// Stored recorded route document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StoredRoute {
    /// Document ID
    pub id: String,
    pub status: RouteStatus,
    /// When the route was stored (RFC3339)
    pub created_at: String,
    /// Denormalized for per-vehicle queries
    pub vehicle_id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub recorded_at_ms: i64,
    pub route: RecordedRoute,
}

impl StoredRoute {
    /// Wrap a freshly recorded route as a pending document.
    pub fn pending(id: String, route: RecordedRoute, created_at: String) -> Self {
        Self {
            id,
            status: RouteStatus::Pending,
            created_at,
            vehicle_id: route.vehicle_id.clone(),
            recorded_at_ms: route.recorded_at_ms,
            route,
        }
    }
}

/// Document ID for a recorded route: vehicle plus recording time.
pub fn route_document_id(vehicle_id: &str, recorded_at_ms: i64) -> String {
    format!("{}_{}", urlencoding::encode(vehicle_id), recorded_at_ms)
}

/// Vehicle document holding the recording feature flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecordingFlag {
    #[serde(default)]
    pub route_recording_enabled: bool,
    #[serde(default)]
    pub updated_at: Option<String>,
}
