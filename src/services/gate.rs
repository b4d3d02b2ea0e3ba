// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-fix acceptance gating.
//!
//! For each incoming fix the gate:
//! 1. Classifies quality from the raw accuracy and picks the thresholds
//! 2. Rejects fixes whose accuracy exceeds the tier bound (counting streaks)
//! 3. Smooths the position through the session's `SignalFilter`
//! 4. Records a new point only after enough movement
//!
//! The first fix of a session is always accepted and seeds the filter.

use crate::models::{Coordinate, GpsFix, QualityTier, Thresholds};
use crate::services::filter::SignalFilter;
use crate::services::geo_math::distance_km;

/// Consecutive rejected fixes that trigger a poor-signal alert.
pub const POOR_SIGNAL_ALERT_COUNT: u32 = 10;
/// Allowed relative difference between reported and computed speed.
const SPEED_TOLERANCE_RATIO: f64 = 0.5;
/// Allowed absolute difference floor between reported and computed speed (m/s).
const SPEED_TOLERANCE_FLOOR_MPS: f64 = 5.0;

/// Last accepted point, used as the reference for movement and time.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Anchor {
    position: Coordinate,
    timestamp_ms: i64,
}

/// Outcome of comparing reported device speed with point-to-point speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedCheck {
    /// No usable reported speed or elapsed time
    Unchecked,
    Consistent,
    Mismatch { reported_mps: f64, computed_mps: f64 },
}

/// Decision for one fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    /// First fix of the session, accepted unconditionally.
    First { position: Coordinate },
    /// Enough movement since the last point; a new point is recorded.
    Accepted {
        position: Coordinate,
        distance_km: f64,
        elapsed_ms: i64,
        speed: SpeedCheck,
    },
    /// Minimum time elapsed without enough movement; nothing is recorded.
    Stationary {
        position: Coordinate,
        distance_km: f64,
        elapsed_ms: i64,
    },
    /// Neither the movement nor the time threshold is met.
    TooClose {
        position: Coordinate,
        distance_km: f64,
        elapsed_ms: i64,
    },
    /// Accuracy exceeds the tier bound.
    PoorAccuracy {
        consecutive_poor: u32,
        /// Set exactly when the streak reaches the alert count
        alert: bool,
    },
}

impl GateDecision {
    /// Whether this decision appends a trajectory point.
    pub fn records_point(&self) -> bool {
        matches!(self, GateDecision::First { .. } | GateDecision::Accepted { .. })
    }

    /// Smoothed position, if the fix got far enough to be smoothed.
    pub fn position(&self) -> Option<Coordinate> {
        match self {
            GateDecision::First { position }
            | GateDecision::Accepted { position, .. }
            | GateDecision::Stationary { position, .. }
            | GateDecision::TooClose { position, .. } => Some(*position),
            GateDecision::PoorAccuracy { .. } => None,
        }
    }
}

/// Stateful gate owned by a single recording session.
#[derive(Debug, Clone, Default)]
pub struct SampleGate {
    filter: Option<SignalFilter>,
    anchor: Option<Anchor>,
    consecutive_poor: u32,
}

impl SampleGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current streak of fixes rejected for accuracy.
    pub fn consecutive_poor(&self) -> u32 {
        self.consecutive_poor
    }

    /// Position of the last accepted point.
    pub fn last_accepted(&self) -> Option<Coordinate> {
        self.anchor.map(|a| a.position)
    }

    /// Reset the poor-reading streak (e.g. after the caller acted on an alert).
    pub fn reset_poor_streak(&mut self) {
        self.consecutive_poor = 0;
    }

    /// Evaluate one fix and update gate state.
    pub fn evaluate(&mut self, fix: &GpsFix) -> GateDecision {
        let thresholds = QualityTier::from_accuracy(fix.accuracy_m).thresholds();

        let Some(anchor) = self.anchor else {
            return self.accept_first(fix);
        };

        let filter = self
            .filter
            .get_or_insert_with(|| SignalFilter::new(anchor.position));
        filter.record(fix);

        if !thresholds.accepts_accuracy(fix.accuracy_m) {
            self.consecutive_poor += 1;
            return GateDecision::PoorAccuracy {
                consecutive_poor: self.consecutive_poor,
                alert: self.consecutive_poor == POOR_SIGNAL_ALERT_COUNT,
            };
        }
        self.consecutive_poor = 0;

        let position = filter.smooth(fix.latitude, fix.longitude, fix.accuracy_m);
        let distance = distance_km(anchor.position, position);
        let elapsed_ms = fix.timestamp_ms.saturating_sub(anchor.timestamp_ms);

        if distance >= thresholds.min_distance_km {
            let speed = check_speed(fix.speed_mps, distance, elapsed_ms);
            self.anchor = Some(Anchor {
                position,
                timestamp_ms: fix.timestamp_ms,
            });
            return GateDecision::Accepted {
                position,
                distance_km: distance,
                elapsed_ms,
                speed,
            };
        }

        if elapsed_ms >= thresholds.min_interval_ms {
            GateDecision::Stationary {
                position,
                distance_km: distance,
                elapsed_ms,
            }
        } else {
            GateDecision::TooClose {
                position,
                distance_km: distance,
                elapsed_ms,
            }
        }
    }

    /// Seed the filter at the raw first fix. The estimators start from their
    /// initial error and the averaging window stays empty.
    fn accept_first(&mut self, fix: &GpsFix) -> GateDecision {
        let position = fix.coordinate();

        self.filter = Some(SignalFilter::new(position));
        self.consecutive_poor = 0;
        self.anchor = Some(Anchor {
            position,
            timestamp_ms: fix.timestamp_ms,
        });
        GateDecision::First { position }
    }
}

/// Thresholds that apply to a fix with this accuracy.
pub fn thresholds_for(accuracy_m: f64) -> Thresholds {
    QualityTier::from_accuracy(accuracy_m).thresholds()
}

/// Compare reported speed with the speed implied by distance over time.
///
/// Advisory only: a mismatch never rejects a point.
pub fn check_speed(reported_mps: Option<f64>, distance_km: f64, elapsed_ms: i64) -> SpeedCheck {
    let reported = match reported_mps {
        Some(s) if s.is_finite() && s > 0.0 => s,
        _ => return SpeedCheck::Unchecked,
    };
    if elapsed_ms <= 0 {
        return SpeedCheck::Unchecked;
    }

    let computed = (distance_km * 1000.0) / (elapsed_ms as f64 / 1000.0);
    let tolerance = (reported * SPEED_TOLERANCE_RATIO).max(SPEED_TOLERANCE_FLOOR_MPS);
    if (computed - reported).abs() < tolerance {
        SpeedCheck::Consistent
    } else {
        SpeedCheck::Mismatch {
            reported_mps: reported,
            computed_mps: computed,
        }
    }
}
