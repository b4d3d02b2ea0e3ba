// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use bus_route_recorder::config::{Config, RecorderSettings};
use bus_route_recorder::db::{FirestoreDb, MemoryDb};
use bus_route_recorder::routes::create_router;
use bus_route_recorder::AppState;
use std::sync::Arc;
use std::time::Duration;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Config with short timeouts so start failures resolve quickly.
#[allow(dead_code)]
pub fn test_config() -> Config {
    Config {
        recorder: RecorderSettings {
            acquisition_backoff: Duration::from_millis(5),
            fix_timeout: Duration::from_millis(200),
            ..RecorderSettings::default()
        },
        ..Config::default()
    }
}

/// Create a test app over in-memory storage.
/// Returns the router, the shared state and the backing store.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<MemoryDb>) {
    let db = Arc::new(MemoryDb::new());
    let state = Arc::new(AppState::new(test_config(), db.clone()));
    (create_router(state.clone()), state, db)
}

/// Build a request with a JSON body.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a request without a body.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Fix JSON as a device would send it.
#[allow(dead_code)]
pub fn fix_json(latitude: f64, longitude: f64, accuracy_m: f64, timestamp_ms: i64) -> serde_json::Value {
    serde_json::json!({
        "latitude": latitude,
        "longitude": longitude,
        "accuracy_m": accuracy_m,
        "timestamp_ms": timestamp_ms,
    })
}
