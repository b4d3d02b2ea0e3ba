// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GPS fix and trajectory point models.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Accuracy assumed when the device does not report one.
pub const UNKNOWN_ACCURACY_M: f64 = 999.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the coordinate is finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<Coordinate> for geo::Coord<f64> {
    fn from(c: Coordinate) -> Self {
        geo::Coord {
            x: c.longitude,
            y: c.latitude,
        }
    }
}

/// One raw reading from the device location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters
    #[serde(default = "unknown_accuracy")]
    pub accuracy_m: f64,
    /// Device timestamp (Unix epoch milliseconds)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub timestamp_ms: i64,
    pub speed_mps: Option<f64>,
    pub heading_deg: Option<f64>,
    pub altitude_m: Option<f64>,
}

fn unknown_accuracy() -> f64 {
    UNKNOWN_ACCURACY_M
}

impl GpsFix {
    /// Create a fix with position, accuracy and time only.
    pub fn new(latitude: f64, longitude: f64, accuracy_m: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m,
            timestamp_ms,
            speed_mps: None,
            heading_deg: None,
            altitude_m: None,
        }
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// A fix is usable if its position is valid and its accuracy is not NaN.
    pub fn is_valid(&self) -> bool {
        self.coordinate().is_valid() && !self.accuracy_m.is_nan()
    }
}

/// A fix accepted into the session trajectory (position already smoothed).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TrajectoryPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub timestamp_ms: i64,
    pub accuracy_m: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_deg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude_m: Option<f64>,
}

impl TrajectoryPoint {
    /// Build a trajectory point from a raw fix placed at the smoothed position.
    pub fn from_fix(fix: &GpsFix, position: Coordinate) -> Self {
        Self {
            latitude: position.latitude,
            longitude: position.longitude,
            timestamp_ms: fix.timestamp_ms,
            accuracy_m: fix.accuracy_m,
            speed_mps: fix.speed_mps,
            heading_deg: fix.heading_deg,
            altitude_m: fix.altitude_m,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}
