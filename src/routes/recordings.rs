// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recording session routes.

use crate::error::Result;
use crate::models::{CheckpointStop, GpsFix, RouteSummary};
use crate::routes::validate_body;
use crate::services::{BeginRecording, RecordingStatus, SamplingConfig};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/recordings", post(create_recording))
        .route(
            "/api/recordings/{id}",
            get(get_recording).delete(cancel_recording),
        )
        .route("/api/recordings/{id}/fixes", post(push_fixes))
        .route("/api/recordings/{id}/checkpoints", post(mark_checkpoint))
        .route(
            "/api/recordings/{id}/checkpoints/{checkpoint_id}",
            delete(remove_checkpoint),
        )
        .route("/api/recordings/{id}/battery", put(set_battery))
        .route("/api/recordings/{id}/stop", post(stop_recording))
}

// ─── Start ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecordingRequest {
    #[validate(length(min = 1, max = 128))]
    pub vehicle_id: String,
    #[validate(length(min = 1, max = 128))]
    pub operator_id: String,
    /// Whether the device granted location permission
    pub location_permission: bool,
    #[serde(default)]
    pub battery_optimized: bool,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreateRecordingResponse {
    pub session_id: String,
    /// Cadence the device should sample at
    pub sampling: SamplingConfig,
}

/// Open a session. The start completes in the background once fixes arrive.
async fn create_recording(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRecordingRequest>,
) -> Result<(StatusCode, Json<CreateRecordingResponse>)> {
    validate_body(&req)?;

    let (session_id, sampling) = state
        .recorder
        .begin(BeginRecording {
            vehicle_id: req.vehicle_id,
            operator_id: req.operator_id,
            location_permission: req.location_permission,
            battery_optimized: req.battery_optimized,
        })
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateRecordingResponse {
            session_id,
            sampling,
        }),
    ))
}

async fn get_recording(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RecordingStatus>> {
    Ok(Json(state.recorder.status(&id).await?))
}

// ─── Fixes ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct PushFixesRequest {
    /// At most 100 fixes per push
    #[validate(length(min = 1, max = 100))]
    pub fixes: Vec<GpsFix>,
}

#[derive(Debug, Serialize)]
pub struct PushFixesResponse {
    pub queued: usize,
}

async fn push_fixes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PushFixesRequest>,
) -> Result<(StatusCode, Json<PushFixesResponse>)> {
    validate_body(&req)?;
    let queued = state.recorder.push_fixes(&id, req.fixes)?;
    Ok((StatusCode::ACCEPTED, Json(PushFixesResponse { queued })))
}

// ─── Checkpoints ─────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CheckpointRequest {
    /// Blank names are rejected by the session with a specific error
    #[validate(length(max = 100))]
    pub name: String,
}

async fn mark_checkpoint(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CheckpointRequest>,
) -> Result<(StatusCode, Json<CheckpointStop>)> {
    validate_body(&req)?;
    let stop = state.recorder.mark_checkpoint(&id, &req.name).await?;
    Ok((StatusCode::CREATED, Json(stop)))
}

async fn remove_checkpoint(
    State(state): State<Arc<AppState>>,
    Path((id, checkpoint_id)): Path<(String, String)>,
) -> Result<Json<CheckpointStop>> {
    Ok(Json(
        state.recorder.remove_checkpoint(&id, &checkpoint_id).await?,
    ))
}

// ─── Battery Mode ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BatteryRequest {
    pub enabled: bool,
}

async fn set_battery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<BatteryRequest>,
) -> Result<Json<SamplingConfig>> {
    Ok(Json(
        state.recorder.set_battery_optimized(&id, req.enabled).await?,
    ))
}

// ─── Stop / Cancel ───────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct StopRequest {
    /// Save even though no bus stops were marked
    #[serde(default)]
    pub save_without_stops: bool,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StopResponse {
    pub route_id: String,
    pub total_distance_km: f64,
    pub checkpoint_count: usize,
    pub summary: RouteSummary,
}

async fn stop_recording(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<StopRequest>,
) -> Result<Json<StopResponse>> {
    let saved = state.recorder.stop(&id, req.save_without_stops).await?;
    Ok(Json(StopResponse {
        route_id: saved.route_id,
        total_distance_km: saved.route.total_distance_km,
        checkpoint_count: saved.route.checkpoints.len(),
        summary: saved.route.summary,
    }))
}

async fn cancel_recording(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.recorder.cancel(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
