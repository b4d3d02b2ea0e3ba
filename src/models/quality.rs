// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GPS quality tiers and the adaptive acceptance thresholds they select.

use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Discrete GPS quality derived from the reported accuracy radius.
///
/// Ordered from best to worst, so `Excellent < Poor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum QualityTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// Acceptance thresholds for one quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    /// Fixes with a larger accuracy radius are rejected (meters)
    pub max_accuracy_m: f64,
    /// Minimum movement before a new point is recorded (km)
    pub min_distance_km: f64,
    /// Minimum time between recorded points (ms)
    pub min_interval_ms: i64,
}

const EXCELLENT: Thresholds = Thresholds {
    max_accuracy_m: 20.0,
    min_distance_km: 0.010,
    min_interval_ms: 5_000,
};
const GOOD: Thresholds = Thresholds {
    max_accuracy_m: 30.0,
    min_distance_km: 0.015,
    min_interval_ms: 7_000,
};
const FAIR: Thresholds = Thresholds {
    max_accuracy_m: 50.0,
    min_distance_km: 0.025,
    min_interval_ms: 10_000,
};
const POOR: Thresholds = Thresholds {
    max_accuracy_m: 70.0,
    min_distance_km: 0.040,
    min_interval_ms: 15_000,
};

impl QualityTier {
    /// Classify an accuracy radius in meters. NaN classifies as `Poor`.
    pub fn from_accuracy(accuracy_m: f64) -> Self {
        if accuracy_m <= 10.0 {
            QualityTier::Excellent
        } else if accuracy_m <= 20.0 {
            QualityTier::Good
        } else if accuracy_m <= 50.0 {
            QualityTier::Fair
        } else {
            QualityTier::Poor
        }
    }

    pub fn thresholds(self) -> Thresholds {
        match self {
            QualityTier::Excellent => EXCELLENT,
            QualityTier::Good => GOOD,
            QualityTier::Fair => FAIR,
            QualityTier::Poor => POOR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Excellent => "excellent",
            QualityTier::Good => "good",
            QualityTier::Fair => "fair",
            QualityTier::Poor => "poor",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Thresholds {
    /// Whether a fix with this accuracy may be used for recording.
    pub fn accepts_accuracy(&self, accuracy_m: f64) -> bool {
        accuracy_m <= self.max_accuracy_m
    }
}
