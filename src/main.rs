// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bus Route Recorder API Server
//!
//! Accepts GPS fixes from operator devices, records bus routes with
//! their stops and stores them for review.

use bus_route_recorder::{
    config::{Config, StorageBackend},
    db::{FirestoreDb, MemoryDb},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        port = config.port,
        backend = ?config.storage_backend,
        tolerance_deg = config.recorder.simplify_tolerance_deg,
        "Starting Bus Route Recorder API"
    );

    let state = match config.storage_backend {
        StorageBackend::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id)
                .await
                .expect("Failed to connect to Firestore");
            AppState::new(config.clone(), Arc::new(db))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; routes are lost on restart");
            AppState::new(config.clone(), Arc::new(MemoryDb::new()))
        }
    };

    // Build router
    let app = bus_route_recorder::routes::create_router(Arc::new(state));

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bus_route_recorder=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
