// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route recording session lifecycle.
//!
//! States: `Idle -> Recording -> {PendingSave -> Stopped | Cancelled}`.
//!
//! A session owns its gate (and through it the signal filter), the accepted
//! trajectory and the checkpoint list. It is driven by exactly one task at a
//! time; hosts that share it across tasks wrap it in a mutex.

use crate::config::RecorderSettings;
use crate::db::{RecordingFlags, RouteStore};
use crate::models::{
    CheckpointStop, Coordinate, GpsFix, QualityTier, RecordedRoute, RouteSummary,
    TrajectoryPoint,
};
use crate::models::checkpoint::remove_and_renumber;
use crate::services::gate::{GateDecision, SampleGate, SpeedCheck};
use crate::services::location::{FixRequest, LocationProvider, PermissionCheck, SamplingConfig};
use crate::services::simplify::simplify_path;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use tokio::sync::watch;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Lifecycle state of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum SessionState {
    Idle,
    Recording,
    /// Stop requested; the route is prepared but not yet confirmed saved
    PendingSave,
    Stopped,
    Cancelled,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Recording => "recording",
            SessionState::PendingSave => "pending_save",
            SessionState::Stopped => "stopped",
            SessionState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Errors from recording session operations.
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("Location permission is required to record a route")]
    PermissionDenied,

    #[error("Route recording is not enabled for vehicle {0}")]
    FeatureDisabled(String),

    #[error("Could not check recording status: {0}")]
    FeatureFlagUnavailable(String),

    #[error("No usable initial GPS fix after {attempts} attempts")]
    InitialFixUnavailable { attempts: u32 },

    #[error("Recording start was cancelled")]
    StartCancelled,

    #[error("Need at least {required} route points before saving, have {have}")]
    InsufficientData { have: usize, required: usize },

    #[error("No bus stops marked; confirm to save without stops")]
    NoCheckpoints,

    #[error("GPS accuracy {accuracy_m:.0} m ({tier}) exceeds the {limit_m:.0} m limit; wait for a better signal")]
    CheckpointRejectedLowAccuracy {
        accuracy_m: f64,
        tier: QualityTier,
        limit_m: f64,
    },

    #[error("Checkpoint name must not be empty")]
    EmptyCheckpointName,

    #[error("Checkpoint {0} not found")]
    CheckpointNotFound(String),

    #[error("Current location not available yet")]
    NoCurrentLocation,

    #[error("Fix has invalid coordinates or accuracy")]
    InvalidFix,

    #[error("Operation not allowed while session is {0}")]
    InvalidState(SessionState),

    #[error("Could not encode trajectory: {0}")]
    InvalidTrajectory(String),

    #[error("Failed to save route: {0}")]
    PersistenceFailure(String),
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRoute {
    pub route_id: String,
    pub route: RecordedRoute,
}

/// Live view of a session for callers.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionSnapshot {
    pub vehicle_id: String,
    pub operator_id: String,
    pub state: SessionState,
    pub quality: Option<QualityTier>,
    pub current_accuracy_m: Option<f64>,
    pub current_position: Option<Coordinate>,
    pub start_point: Option<Coordinate>,
    pub total_distance_km: f64,
    pub point_count: usize,
    pub checkpoints: Vec<CheckpointStop>,
    pub consecutive_poor_readings: u32,
    pub battery_optimized: bool,
    pub sampling: SamplingConfig,
}

/// One route recording for one vehicle.
#[derive(Debug)]
pub struct RecordingSession {
    vehicle_id: String,
    operator_id: String,
    settings: RecorderSettings,
    state: SessionState,
    gate: SampleGate,
    trajectory: Vec<TrajectoryPoint>,
    simplified: Vec<TrajectoryPoint>,
    recent_fixes: VecDeque<GpsFix>,
    checkpoints: Vec<CheckpointStop>,
    next_checkpoint_seq: u64,
    total_distance_km: f64,
    start_point: Option<Coordinate>,
    current_fix: Option<GpsFix>,
    current_position: Option<Coordinate>,
    battery_optimized: bool,
    pending: Option<RecordedRoute>,
}

impl RecordingSession {
    pub fn new(
        vehicle_id: impl Into<String>,
        operator_id: impl Into<String>,
        settings: RecorderSettings,
    ) -> Self {
        let recent_fixes = VecDeque::with_capacity(settings.recent_fix_capacity + 1);
        Self {
            vehicle_id: vehicle_id.into(),
            operator_id: operator_id.into(),
            settings,
            state: SessionState::Idle,
            gate: SampleGate::new(),
            trajectory: Vec::new(),
            simplified: Vec::new(),
            recent_fixes,
            checkpoints: Vec::new(),
            next_checkpoint_seq: 1,
            total_distance_km: 0.0,
            start_point: None,
            current_fix: None,
            current_position: None,
            battery_optimized: false,
            pending: None,
        }
    }

    // ─── Accessors ───────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn trajectory(&self) -> &[TrajectoryPoint] {
        &self.trajectory
    }

    /// Simplified trajectory, populated once `stop()` has prepared the route.
    pub fn simplified(&self) -> &[TrajectoryPoint] {
        &self.simplified
    }

    pub fn checkpoints(&self) -> &[CheckpointStop] {
        &self.checkpoints
    }

    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_km
    }

    pub fn start_point(&self) -> Option<Coordinate> {
        self.start_point
    }

    /// Quality of the most recent fix.
    pub fn current_quality(&self) -> Option<QualityTier> {
        self.current_fix
            .map(|f| QualityTier::from_accuracy(f.accuracy_m))
    }

    /// Smoothed position of the most recent usable fix.
    pub fn current_position(&self) -> Option<Coordinate> {
        self.current_position
    }

    pub fn consecutive_poor_readings(&self) -> u32 {
        self.gate.consecutive_poor()
    }

    /// The last few raw fixes, oldest first.
    pub fn recent_fixes(&self) -> impl Iterator<Item = &GpsFix> {
        self.recent_fixes.iter()
    }

    /// Route prepared by a stop whose save has not been confirmed.
    pub fn pending_route(&self) -> Option<&RecordedRoute> {
        self.pending.as_ref()
    }

    pub fn sampling_config(&self) -> SamplingConfig {
        SamplingConfig::for_mode(self.battery_optimized)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            vehicle_id: self.vehicle_id.clone(),
            operator_id: self.operator_id.clone(),
            state: self.state,
            quality: self.current_quality(),
            current_accuracy_m: self.current_fix.map(|f| f.accuracy_m),
            current_position: self.current_position,
            start_point: self.start_point,
            total_distance_km: self.total_distance_km,
            point_count: self.trajectory.len(),
            checkpoints: self.checkpoints.clone(),
            consecutive_poor_readings: self.gate.consecutive_poor(),
            battery_optimized: self.battery_optimized,
            sampling: self.sampling_config(),
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────────

    /// Start recording.
    ///
    /// Checks permission and the vehicle's recording flag, then acquires an
    /// initial fix with bounded retries. The initial fix becomes the start
    /// point and the first trajectory point. Acquisition stops early when
    /// `cancel` flips to `true`; the session then stays `Idle`.
    pub async fn start(
        &mut self,
        location: &dyn LocationProvider,
        permission: &dyn PermissionCheck,
        flags: &dyn RecordingFlags,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<GateDecision, RecordingError> {
        self.require(SessionState::Idle)?;

        if !permission.has_location_permission() {
            return Err(RecordingError::PermissionDenied);
        }

        let enabled = flags
            .is_recording_enabled(&self.vehicle_id)
            .await
            .map_err(|e| RecordingError::FeatureFlagUnavailable(e.to_string()))?;
        if !enabled {
            return Err(RecordingError::FeatureDisabled(self.vehicle_id.clone()));
        }

        let fix = tokio::select! {
            biased;
            _ = cancelled(cancel) => {
                tracing::info!(vehicle_id = %self.vehicle_id, "Recording start cancelled");
                return Err(RecordingError::StartCancelled);
            }
            result = acquire_initial_fix(location, &self.settings) => result?,
        };

        self.start_point = Some(fix.coordinate());
        self.state = SessionState::Recording;
        tracing::info!(
            vehicle_id = %self.vehicle_id,
            operator_id = %self.operator_id,
            accuracy_m = fix.accuracy_m,
            "Route recording started"
        );

        self.on_fix(fix)
    }

    /// Feed one fix through the gate.
    ///
    /// Rejected fixes are not errors; the returned decision says what
    /// happened. Errors only for invalid input or a non-recording session.
    pub fn on_fix(&mut self, fix: GpsFix) -> Result<GateDecision, RecordingError> {
        self.require(SessionState::Recording)?;
        if !fix.is_valid() {
            return Err(RecordingError::InvalidFix);
        }

        self.recent_fixes.push_back(fix);
        if self.recent_fixes.len() > self.settings.recent_fix_capacity {
            self.recent_fixes.pop_front();
        }
        self.current_fix = Some(fix);

        let decision = self.gate.evaluate(&fix);
        let quality = QualityTier::from_accuracy(fix.accuracy_m);

        if let Some(position) = decision.position() {
            self.current_position = Some(position);
        }

        match decision {
            GateDecision::First { position } => {
                self.trajectory.push(TrajectoryPoint::from_fix(&fix, position));
            }
            GateDecision::Accepted {
                position,
                distance_km,
                speed,
                ..
            } => {
                if let SpeedCheck::Mismatch {
                    reported_mps,
                    computed_mps,
                } = speed
                {
                    tracing::warn!(
                        vehicle_id = %self.vehicle_id,
                        reported_mps,
                        computed_mps,
                        "Speed mismatch between device and computed speed"
                    );
                }
                self.total_distance_km += distance_km;
                self.trajectory.push(TrajectoryPoint::from_fix(&fix, position));
                tracing::debug!(
                    vehicle_id = %self.vehicle_id,
                    distance_m = distance_km * 1000.0,
                    accuracy_m = fix.accuracy_m,
                    %quality,
                    points = self.trajectory.len(),
                    "Point recorded"
                );
            }
            GateDecision::Stationary {
                distance_km,
                elapsed_ms,
                ..
            }
            | GateDecision::TooClose {
                distance_km,
                elapsed_ms,
                ..
            } => {
                tracing::debug!(
                    vehicle_id = %self.vehicle_id,
                    distance_m = distance_km * 1000.0,
                    elapsed_ms,
                    "Skipping fix"
                );
            }
            GateDecision::PoorAccuracy {
                consecutive_poor,
                alert,
            } => {
                tracing::debug!(
                    vehicle_id = %self.vehicle_id,
                    accuracy_m = fix.accuracy_m,
                    consecutive_poor,
                    "Poor GPS fix rejected"
                );
                if alert {
                    tracing::warn!(
                        vehicle_id = %self.vehicle_id,
                        consecutive_poor,
                        "Poor GPS signal; suggest battery optimization or moving to open sky"
                    );
                }
            }
        }

        Ok(decision)
    }

    /// Mark a bus stop at the current location.
    pub fn mark_checkpoint(&mut self, name: &str) -> Result<CheckpointStop, RecordingError> {
        self.require(SessionState::Recording)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(RecordingError::EmptyCheckpointName);
        }

        let fix = self.current_fix.ok_or(RecordingError::NoCurrentLocation)?;
        let tier = QualityTier::from_accuracy(fix.accuracy_m);
        let thresholds = tier.thresholds();
        if !thresholds.accepts_accuracy(fix.accuracy_m) {
            return Err(RecordingError::CheckpointRejectedLowAccuracy {
                accuracy_m: fix.accuracy_m,
                tier,
                limit_m: thresholds.max_accuracy_m,
            });
        }

        let stop = CheckpointStop {
            id: format!("stop-{}", self.next_checkpoint_seq),
            name: name.to_string(),
            latitude: fix.latitude,
            longitude: fix.longitude,
            order: self.checkpoints.len() as u32 + 1,
            timestamp_ms: fix.timestamp_ms,
        };
        self.next_checkpoint_seq += 1;
        self.checkpoints.push(stop.clone());

        tracing::info!(
            vehicle_id = %self.vehicle_id,
            stop = %stop.name,
            order = stop.order,
            accuracy_m = fix.accuracy_m,
            "Bus stop marked"
        );
        Ok(stop)
    }

    /// Remove a bus stop and renumber the rest.
    pub fn remove_checkpoint(&mut self, id: &str) -> Result<CheckpointStop, RecordingError> {
        self.require(SessionState::Recording)?;
        remove_and_renumber(&mut self.checkpoints, id)
            .ok_or_else(|| RecordingError::CheckpointNotFound(id.to_string()))
    }

    /// Switch sampling cadence. Gate thresholds are unaffected.
    pub fn set_battery_optimized(&mut self, enabled: bool) -> Result<SamplingConfig, RecordingError> {
        if !matches!(self.state, SessionState::Idle | SessionState::Recording) {
            return Err(RecordingError::InvalidState(self.state));
        }
        self.battery_optimized = enabled;
        tracing::info!(vehicle_id = %self.vehicle_id, enabled, "Battery optimization toggled");
        Ok(self.sampling_config())
    }

    /// Discard the recording. Nothing is persisted.
    pub fn cancel(&mut self) -> Result<(), RecordingError> {
        if matches!(self.state, SessionState::Stopped | SessionState::Cancelled) {
            return Err(RecordingError::InvalidState(self.state));
        }

        self.trajectory.clear();
        self.simplified.clear();
        self.checkpoints.clear();
        self.recent_fixes.clear();
        self.pending = None;
        self.total_distance_km = 0.0;
        self.state = SessionState::Cancelled;

        tracing::info!(vehicle_id = %self.vehicle_id, "Route recording cancelled");
        Ok(())
    }

    /// Stop recording and save the simplified route.
    ///
    /// On a save failure the session stays `PendingSave` with the prepared
    /// route kept; calling `stop` again retries the same payload.
    pub async fn stop(
        &mut self,
        save_without_stops: bool,
        store: &dyn RouteStore,
    ) -> Result<SavedRoute, RecordingError> {
        match self.state {
            SessionState::PendingSave => return self.save_pending(store).await,
            SessionState::Recording => {}
            other => return Err(RecordingError::InvalidState(other)),
        }

        let required = self.settings.min_points_to_save;
        if self.trajectory.len() < required {
            return Err(RecordingError::InsufficientData {
                have: self.trajectory.len(),
                required,
            });
        }
        if self.checkpoints.is_empty() && !save_without_stops {
            return Err(RecordingError::NoCheckpoints);
        }

        let route = self.prepare_route()?;
        tracing::info!(
            vehicle_id = %self.vehicle_id,
            raw_points = route.summary.raw_point_count,
            simplified_points = route.summary.simplified_point_count,
            reduction_pct = route.summary.reduction_ratio * 100.0,
            distance_km = route.total_distance_km,
            "Path simplified"
        );

        self.simplified = route.simplified_trajectory.clone();
        self.pending = Some(route);
        self.state = SessionState::PendingSave;

        self.save_pending(store).await
    }

    async fn save_pending(&mut self, store: &dyn RouteStore) -> Result<SavedRoute, RecordingError> {
        let route = self
            .pending
            .clone()
            .ok_or(RecordingError::InvalidState(self.state))?;

        match store.save_route(&route).await {
            Ok(route_id) => {
                self.state = SessionState::Stopped;
                self.pending = None;
                tracing::info!(
                    vehicle_id = %self.vehicle_id,
                    route_id = %route_id,
                    "Recorded route saved"
                );
                Ok(SavedRoute { route_id, route })
            }
            Err(e) => {
                tracing::error!(
                    vehicle_id = %self.vehicle_id,
                    error = %e,
                    "Failed to save recorded route; keeping it for retry"
                );
                Err(RecordingError::PersistenceFailure(e.to_string()))
            }
        }
    }

    /// Build the persistence payload from the current trajectory.
    fn prepare_route(&self) -> Result<RecordedRoute, RecordingError> {
        let insufficient = || RecordingError::InsufficientData {
            have: self.trajectory.len(),
            required: self.settings.min_points_to_save,
        };
        let first = self.trajectory.first().ok_or_else(insufficient)?;
        let last = self.trajectory.last().ok_or_else(insufficient)?;

        let start_point = self.start_point.unwrap_or_else(|| first.coordinate());
        let end_point = self
            .current_fix
            .map(|f| f.coordinate())
            .unwrap_or_else(|| last.coordinate());

        let simplified = simplify_path(&self.trajectory, self.settings.simplify_tolerance_deg);
        let encoded_polyline = polyline::encode_coordinates(
            simplified.points.iter().map(|p| geo::Coord::from(p.coordinate())),
            5,
        )
        .map_err(|e| RecordingError::InvalidTrajectory(e.to_string()))?;

        let average_accuracy_m = self.trajectory.iter().map(|p| p.accuracy_m).sum::<f64>()
            / self.trajectory.len() as f64;

        let summary = RouteSummary {
            raw_point_count: self.trajectory.len(),
            simplified_point_count: simplified.points.len(),
            reduction_ratio: simplified.reduction_ratio(),
            average_accuracy_m,
            duration_ms: last.timestamp_ms.saturating_sub(first.timestamp_ms),
            battery_optimized: self.battery_optimized,
        };

        Ok(RecordedRoute {
            vehicle_id: self.vehicle_id.clone(),
            operator_id: self.operator_id.clone(),
            start_point,
            end_point,
            simplified_trajectory: simplified.points,
            checkpoints: self.checkpoints.clone(),
            total_distance_km: self.total_distance_km,
            recorded_at_ms: chrono::Utc::now().timestamp_millis(),
            encoded_polyline,
            summary,
        })
    }

    fn require(&self, expected: SessionState) -> Result<(), RecordingError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(RecordingError::InvalidState(self.state))
        }
    }
}

/// Resolve once the cancel flag is set. Never resolves if the sender is gone.
pub(crate) async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|c| *c).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Fetch an initial fix, retrying until one is accurate enough.
async fn acquire_initial_fix(
    location: &dyn LocationProvider,
    settings: &RecorderSettings,
) -> Result<GpsFix, RecordingError> {
    let attempts = settings.acquisition_attempts.max(1);

    for attempt in 1..=attempts {
        match location
            .current_fix(FixRequest::navigation(settings.fix_timeout))
            .await
        {
            Ok(fix) if fix.is_valid() && fix.accuracy_m < settings.acquisition_max_accuracy_m => {
                return Ok(fix);
            }
            Ok(fix) => {
                tracing::debug!(attempt, accuracy_m = fix.accuracy_m, "Initial fix not usable");
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "Initial fix request failed");
            }
        }

        if attempt < attempts {
            tokio::time::sleep(settings.acquisition_backoff).await;
        }
    }

    Err(RecordingError::InitialFixUnavailable { attempts })
}
