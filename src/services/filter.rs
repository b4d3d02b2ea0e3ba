// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Position smoothing for incoming GPS fixes.
//!
//! Two estimators run side by side:
//! - a 1-D Kalman filter per axis, trusted for high-accuracy fixes
//! - an inverse-accuracy weighted average over the last few fixes,
//!   used when accuracy is moderate
//!
//! Fixes with poor accuracy pass through unchanged.

use crate::models::{Coordinate, GpsFix};
use std::collections::VecDeque;

/// Process noise.
pub const PROCESS_NOISE: f64 = 1e-5;
/// Measurement noise.
pub const MEASUREMENT_NOISE: f64 = 1e-2;
/// Initial estimation error.
const INITIAL_ERROR: f64 = 1.0;

/// Number of recent fixes kept for the weighted average.
pub const SMOOTHING_WINDOW: usize = 5;
/// Below this accuracy (m) the Kalman estimate is used.
const KALMAN_ACCURACY_LIMIT_M: f64 = 15.0;
/// Below this accuracy (m) the weighted average is used.
const AVERAGE_ACCURACY_LIMIT_M: f64 = 30.0;
/// Minimum buffered fixes before the weighted average is trusted.
const MIN_AVERAGE_SAMPLES: usize = 3;

/// One-dimensional recursive estimator.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarKalman {
    q: f64,
    r: f64,
    error: f64,
    estimate: f64,
}

impl ScalarKalman {
    pub fn new(initial: f64) -> Self {
        Self::with_noise(initial, PROCESS_NOISE, MEASUREMENT_NOISE)
    }

    pub fn with_noise(initial: f64, q: f64, r: f64) -> Self {
        Self {
            q,
            r,
            error: INITIAL_ERROR,
            estimate: initial,
        }
    }

    /// Run one predict/update cycle and return the new estimate.
    pub fn filter(&mut self, measurement: f64) -> f64 {
        self.error += self.q;
        let gain = self.error / (self.error + self.r);
        self.estimate += gain * (measurement - self.estimate);
        self.error *= 1.0 - gain;
        self.estimate
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    pub fn error(&self) -> f64 {
        self.error
    }
}

/// Per-session smoother combining the Kalman and weighted-average estimators.
#[derive(Debug, Clone)]
pub struct SignalFilter {
    lat: ScalarKalman,
    lon: ScalarKalman,
    recent: VecDeque<(Coordinate, f64)>,
}

impl SignalFilter {
    /// Seed both axes at the first known position.
    pub fn new(seed: Coordinate) -> Self {
        Self {
            lat: ScalarKalman::new(seed.latitude),
            lon: ScalarKalman::new(seed.longitude),
            recent: VecDeque::with_capacity(SMOOTHING_WINDOW + 1),
        }
    }

    /// Add a raw fix to the weighted-average window.
    pub fn record(&mut self, fix: &GpsFix) {
        self.recent.push_back((fix.coordinate(), fix.accuracy_m));
        if self.recent.len() > SMOOTHING_WINDOW {
            self.recent.pop_front();
        }
    }

    /// Smooth a raw position according to its accuracy.
    pub fn smooth(&mut self, lat: f64, lon: f64, accuracy_m: f64) -> Coordinate {
        if accuracy_m < KALMAN_ACCURACY_LIMIT_M {
            return Coordinate::new(self.lat.filter(lat), self.lon.filter(lon));
        }

        if accuracy_m < AVERAGE_ACCURACY_LIMIT_M && self.recent.len() >= MIN_AVERAGE_SAMPLES {
            return self.weighted_average();
        }

        Coordinate::new(lat, lon)
    }

    /// Number of fixes currently in the averaging window.
    pub fn buffered(&self) -> usize {
        self.recent.len()
    }

    fn weighted_average(&self) -> Coordinate {
        let weight = |accuracy: f64| 1.0 / if accuracy == 0.0 { 1.0 } else { accuracy };
        let total: f64 = self.recent.iter().map(|(_, a)| weight(*a)).sum();

        let (lat, lon) = self.recent.iter().fold((0.0, 0.0), |(lat, lon), (c, a)| {
            let w = weight(*a) / total;
            (lat + c.latitude * w, lon + c.longitude * w)
        });
        Coordinate::new(lat, lon)
    }
}
