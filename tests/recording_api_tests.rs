// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP tests for the recording lifecycle over in-memory storage.

use axum::http::StatusCode;
use bus_route_recorder::error::AppError;
use bus_route_recorder::services::{BeginRecording, StartStatus};
use bus_route_recorder::AppState;
use serde_json::json;
use std::time::Duration;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, empty_request, fix_json, json_request};

const LAT: f64 = 12.9716;
const LON: f64 = 77.5946;

async fn enable_vehicle(app: &axum::Router, vehicle_id: &str) {
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/vehicles/{}/recording-status", vehicle_id),
            json!({ "enabled": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

async fn open_session(app: &axum::Router, vehicle_id: &str, permission: bool) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/recordings",
            json!({
                "vehicle_id": vehicle_id,
                "operator_id": "op-7",
                "location_permission": permission,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["sampling"]["min_time_interval_ms"], 5000);
    body["session_id"].as_str().unwrap().to_string()
}

async fn push(app: &axum::Router, session_id: &str, fixes: Vec<serde_json::Value>) -> StatusCode {
    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/recordings/{}/fixes", session_id),
            json!({ "fixes": fixes }),
        ))
        .await
        .unwrap()
        .status()
}

async fn wait_started(state: &AppState, session_id: &str) -> StartStatus {
    tokio::time::timeout(
        Duration::from_secs(5),
        state.recorder.wait_started(session_id),
    )
    .await
    .expect("start did not finish")
    .unwrap()
}

async fn wait_for_points(state: &AppState, session_id: &str, count: usize) {
    for _ in 0..500 {
        let status = state.recorder.status(session_id).await.unwrap();
        if status.session.is_some_and(|s| s.point_count >= count) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session never reached {} points", count);
}

/// Open a session for an enabled vehicle and record two points.
async fn recording_with_two_points(
    app: &axum::Router,
    state: &AppState,
    vehicle_id: &str,
) -> String {
    enable_vehicle(app, vehicle_id).await;
    let id = open_session(app, vehicle_id, true).await;

    assert_eq!(push(app, &id, vec![fix_json(LAT, LON, 8.0, 0)]).await, StatusCode::ACCEPTED);
    assert_eq!(wait_started(state, &id).await, StartStatus::Started);

    let moved = fix_json(LAT + 0.001, LON, 8.0, 10_000);
    assert_eq!(push(app, &id, vec![moved]).await, StatusCode::ACCEPTED);
    wait_for_points(state, &id, 2).await;
    id
}

#[tokio::test]
async fn test_full_recording_flow() {
    let (app, state, db) = create_test_app();
    let id = recording_with_two_points(&app, &state, "bus-12").await;

    let response = app
        .clone()
        .oneshot(empty_request("GET", &format!("/api/recordings/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = body_json(response).await;
    assert_eq!(status["start"]["phase"], "started");
    assert_eq!(status["session"]["state"], "recording");
    assert_eq!(status["session"]["quality"], "excellent");
    assert_eq!(status["session"]["point_count"], 2);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/recordings/{}/checkpoints", id),
            json!({ "name": "Stop A" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let stop = body_json(response).await;
    assert_eq!(stop["order"], 1);
    assert_eq!(stop["id"], "stop-1");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/recordings/{}/stop", id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let saved = body_json(response).await;
    assert_eq!(saved["checkpoint_count"], 1);
    assert_eq!(saved["summary"]["raw_point_count"], 2);
    assert!(saved["total_distance_km"].as_f64().unwrap() > 0.01);
    let route_id = saved["route_id"].as_str().unwrap().to_string();
    assert_eq!(db.route_count(), 1);

    // Finished sessions are released
    let response = app
        .clone()
        .oneshot(empty_request("GET", &format!("/api/recordings/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/vehicles/bus-12/routes"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let routes = body_json(response).await;
    assert_eq!(routes.as_array().unwrap().len(), 1);
    assert_eq!(routes[0]["id"], route_id.as_str());
    assert_eq!(routes[0]["status"], "pending");

    let response = app
        .clone()
        .oneshot(empty_request("GET", &format!("/api/routes/{}/geojson", route_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let geojson = body_json(response).await;
    assert_eq!(geojson["type"], "FeatureCollection");
    // trajectory, start, end, one stop
    assert_eq!(geojson["features"].as_array().unwrap().len(), 4);
    assert_eq!(geojson["features"][0]["geometry"]["type"], "LineString");
    assert_eq!(geojson["features"][3]["properties"]["name"], "Stop A");
}

#[tokio::test]
async fn test_stop_without_checkpoints_needs_confirmation() {
    let (app, state, _db) = create_test_app();
    let id = recording_with_two_points(&app, &state, "bus-3").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/recordings/{}/stop", id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"], "no_checkpoints");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/recordings/{}/stop", id),
            json!({ "save_without_stops": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_failed_save_can_be_retried() {
    let (app, state, db) = create_test_app();
    let id = recording_with_two_points(&app, &state, "bus-4").await;
    let stop = || {
        json_request(
            "POST",
            &format!("/api/recordings/{}/stop", id),
            json!({ "save_without_stops": true }),
        )
    };

    db.set_fail_writes(true);
    let response = app.clone().oneshot(stop()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"], "persistence_failure");

    let status = state.recorder.status(&id).await.unwrap();
    assert_eq!(
        status.session.map(|s| s.state),
        Some(bus_route_recorder::services::SessionState::PendingSave)
    );

    db.set_fail_writes(false);
    let response = app.clone().oneshot(stop()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(db.route_count(), 1);
}

#[tokio::test]
async fn test_disabled_vehicle_fails_start() {
    let (app, state, _db) = create_test_app();
    let id = open_session(&app, "bus-9", true).await;

    match wait_started(&state, &id).await {
        StartStatus::Failed { error } => assert!(error.contains("not enabled")),
        other => panic!("unexpected start status {:?}", other),
    }

    let response = app
        .clone()
        .oneshot(empty_request("GET", &format!("/api/recordings/{}", id)))
        .await
        .unwrap();
    let status = body_json(response).await;
    assert_eq!(status["start"]["phase"], "failed");
    assert_eq!(status["session"]["state"], "idle");

    // A failed session does not block a new one
    enable_vehicle(&app, "bus-9").await;
    open_session(&app, "bus-9", true).await;
}

#[tokio::test]
async fn test_missing_permission_fails_start() {
    let (app, state, _db) = create_test_app();
    enable_vehicle(&app, "bus-5").await;
    let id = open_session(&app, "bus-5", false).await;

    assert!(matches!(
        wait_started(&state, &id).await,
        StartStatus::Failed { .. }
    ));
}

#[tokio::test]
async fn test_no_fix_fails_start() {
    let (app, state, _db) = create_test_app();
    enable_vehicle(&app, "bus-6").await;
    let id = open_session(&app, "bus-6", true).await;

    match wait_started(&state, &id).await {
        StartStatus::Failed { error } => assert!(error.contains("3 attempts")),
        other => panic!("unexpected start status {:?}", other),
    }
}

#[tokio::test]
async fn test_second_live_session_rejected() {
    let (app, state, _db) = create_test_app();
    recording_with_two_points(&app, &state, "bus-7").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/recordings",
            json!({
                "vehicle_id": "bus-7",
                "operator_id": "op-8",
                "location_permission": true,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_begins_for_one_vehicle() {
    let (app, state, _db) = create_test_app();
    let failed = open_session(&app, "bus-3", true).await;
    assert!(matches!(
        wait_started(&state, &failed).await,
        StartStatus::Failed { .. }
    ));
    enable_vehicle(&app, "bus-3").await;

    let begins = (0..16).map(|i| {
        state.recorder.begin(BeginRecording {
            vehicle_id: "bus-3".to_string(),
            operator_id: format!("op-{}", i),
            location_permission: true,
            battery_optimized: false,
        })
    });
    let results = futures_util::future::join_all(begins).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, AppError::Conflict(_))));
    assert_eq!(state.recorder.session_count(), 1);
}

#[tokio::test]
async fn test_cancel_releases_session() {
    let (app, state, db) = create_test_app();
    let id = recording_with_two_points(&app, &state, "bus-8").await;

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/recordings/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(db.route_count(), 0);
    assert_eq!(state.recorder.session_count(), 0);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/recordings/{}/stop", id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_during_start() {
    let (app, state, _db) = create_test_app();
    enable_vehicle(&app, "bus-10").await;
    let id = open_session(&app, "bus-10", true).await;

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/recordings/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(state.recorder.session_count(), 0);
}

#[tokio::test]
async fn test_checkpoint_removal_renumbers() {
    let (app, state, _db) = create_test_app();
    let id = recording_with_two_points(&app, &state, "bus-11").await;

    for name in ["A", "B", "C"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/recordings/{}/checkpoints", id),
                json!({ "name": name }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(empty_request(
            "DELETE",
            &format!("/api/recordings/{}/checkpoints/stop-1", id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status = state.recorder.status(&id).await.unwrap();
    let stops = status.session.unwrap().checkpoints;
    let orders: Vec<(&str, u32)> = stops.iter().map(|s| (s.name.as_str(), s.order)).collect();
    assert_eq!(orders, vec![("B", 1), ("C", 2)]);

    let response = app
        .clone()
        .oneshot(empty_request(
            "DELETE",
            &format!("/api/recordings/{}/checkpoints/stop-1", id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "checkpoint_not_found");
}

#[tokio::test]
async fn test_blank_checkpoint_name() {
    let (app, state, _db) = create_test_app();
    let id = recording_with_two_points(&app, &state, "bus-13").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/recordings/{}/checkpoints", id),
            json!({ "name": "   " }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"], "empty_checkpoint_name");
}

#[tokio::test]
async fn test_battery_toggle_returns_cadence() {
    let (app, state, _db) = create_test_app();
    let id = recording_with_two_points(&app, &state, "bus-14").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/recordings/{}/battery", id),
            json!({ "enabled": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let sampling = body_json(response).await;
    assert_eq!(sampling["min_time_interval_ms"], 10000);
    assert_eq!(sampling["min_distance_m"], 20.0);

    // Fixes still flow after resubscribing
    let far = fix_json(LAT + 0.003, LON, 8.0, 30_000);
    assert_eq!(push(&app, &id, vec![far]).await, StatusCode::ACCEPTED);
    wait_for_points(&state, &id, 3).await;
}
