// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: storage traits plus Firestore and in-memory backends.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{RecordedRoute, StoredRoute};
use futures_util::future::BoxFuture;

/// Collection names as constants.
pub mod collections {
    /// Vehicle documents (recording feature flag)
    pub const VEHICLES: &str = "vehicles";
    /// Recorded routes awaiting review
    pub const RECORDED_ROUTES: &str = "recorded_routes";
}

/// Default number of routes returned by `recent_routes`.
pub const DEFAULT_ROUTE_LIMIT: u32 = 10;
/// Upper bound on routes returned by `recent_routes`.
pub const MAX_ROUTE_LIMIT: u32 = 50;

/// Per-vehicle "route recording enabled" flag.
pub trait RecordingFlags: Send + Sync {
    fn is_recording_enabled<'a>(&'a self, vehicle_id: &'a str) -> BoxFuture<'a, Result<bool, AppError>>;

    fn set_recording_enabled<'a>(
        &'a self,
        vehicle_id: &'a str,
        enabled: bool,
    ) -> BoxFuture<'a, Result<(), AppError>>;
}

/// Storage for recorded routes.
pub trait RouteStore: Send + Sync {
    /// Persist a recorded route as a pending document, returning its ID.
    fn save_route<'a>(&'a self, route: &'a RecordedRoute) -> BoxFuture<'a, Result<String, AppError>>;

    /// Most recent routes for a vehicle, newest first.
    fn recent_routes<'a>(
        &'a self,
        vehicle_id: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<StoredRoute>, AppError>>;

    fn get_route<'a>(&'a self, route_id: &'a str) -> BoxFuture<'a, Result<Option<StoredRoute>, AppError>>;
}
