// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vehicle recording flags and recorded route queries.

use crate::db::{RecordingFlags, RouteStore, DEFAULT_ROUTE_LIMIT, MAX_ROUTE_LIMIT};
use crate::error::{AppError, Result};
use crate::models::RouteStatus;
use crate::services::export::route_to_geojson;
use crate::time_utils::format_epoch_ms;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use geojson::GeoJson;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/vehicles/{id}/recording-status",
            get(get_recording_status).put(set_recording_status),
        )
        .route("/api/vehicles/{id}/routes", get(list_routes))
        .route("/api/routes/{id}/geojson", get(route_geojson))
}

// ─── Recording Flag ──────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecordingStatusBody {
    pub enabled: bool,
}

async fn get_recording_status(
    State(state): State<Arc<AppState>>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<RecordingStatusBody>> {
    let enabled = state.flags.is_recording_enabled(&vehicle_id).await?;
    Ok(Json(RecordingStatusBody { enabled }))
}

async fn set_recording_status(
    State(state): State<Arc<AppState>>,
    Path(vehicle_id): Path<String>,
    Json(body): Json<RecordingStatusBody>,
) -> Result<Json<RecordingStatusBody>> {
    if vehicle_id.len() > 128 {
        return Err(AppError::BadRequest("vehicle id too long".to_string()));
    }
    state
        .flags
        .set_recording_enabled(&vehicle_id, body.enabled)
        .await?;
    Ok(Json(body))
}

// ─── Recorded Routes ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RoutesQuery {
    pub limit: Option<u32>,
}

/// One entry in a vehicle's route list.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RouteListItem {
    pub id: String,
    pub status: RouteStatus,
    pub recorded_at: Option<String>,
    pub operator_id: String,
    pub total_distance_km: f64,
    pub checkpoint_count: usize,
    pub point_count: usize,
}

async fn list_routes(
    State(state): State<Arc<AppState>>,
    Path(vehicle_id): Path<String>,
    Query(query): Query<RoutesQuery>,
) -> Result<Json<Vec<RouteListItem>>> {
    let limit = match query.limit {
        None => DEFAULT_ROUTE_LIMIT,
        Some(0) => return Err(AppError::BadRequest("limit must be positive".to_string())),
        Some(n) => n.min(MAX_ROUTE_LIMIT),
    };

    let routes = state.store.recent_routes(&vehicle_id, limit).await?;
    let items = routes
        .into_iter()
        .map(|r| RouteListItem {
            recorded_at: format_epoch_ms(r.recorded_at_ms),
            operator_id: r.route.operator_id,
            total_distance_km: r.route.total_distance_km,
            checkpoint_count: r.route.checkpoints.len(),
            point_count: r.route.simplified_trajectory.len(),
            id: r.id,
            status: r.status,
        })
        .collect();
    Ok(Json(items))
}

async fn route_geojson(
    State(state): State<Arc<AppState>>,
    Path(route_id): Path<String>,
) -> Result<Json<GeoJson>> {
    let stored = state
        .store
        .get_route(&route_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Route {}", route_id)))?;
    Ok(Json(route_to_geojson(&stored)))
}
