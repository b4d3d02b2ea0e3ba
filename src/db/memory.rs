// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory storage backend for local development and tests.

use crate::db::{RecordingFlags, RouteStore, MAX_ROUTE_LIMIT};
use crate::error::AppError;
use crate::models::route::route_document_id;
use crate::models::{RecordedRoute, StoredRoute};
use crate::time_utils::now_rfc3339;
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};

/// Routes and flags held in concurrent maps.
#[derive(Debug, Default)]
pub struct MemoryDb {
    flags: DashMap<String, bool>,
    routes: DashMap<String, StoredRoute>,
    fail_writes: AtomicBool,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make route saves fail until cleared, to exercise retry paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

impl RecordingFlags for MemoryDb {
    fn is_recording_enabled<'a>(&'a self, vehicle_id: &'a str) -> BoxFuture<'a, Result<bool, AppError>> {
        Box::pin(async move { Ok(self.flags.get(vehicle_id).is_some_and(|f| *f)) })
    }

    fn set_recording_enabled<'a>(
        &'a self,
        vehicle_id: &'a str,
        enabled: bool,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            self.flags.insert(vehicle_id.to_string(), enabled);
            Ok(())
        })
    }
}

impl RouteStore for MemoryDb {
    fn save_route<'a>(&'a self, route: &'a RecordedRoute) -> BoxFuture<'a, Result<String, AppError>> {
        Box::pin(async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(AppError::Database("write rejected".to_string()));
            }
            let id = route_document_id(&route.vehicle_id, route.recorded_at_ms);
            let stored = StoredRoute::pending(id.clone(), route.clone(), now_rfc3339());
            self.routes.insert(id.clone(), stored);
            Ok(id)
        })
    }

    fn recent_routes<'a>(
        &'a self,
        vehicle_id: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<StoredRoute>, AppError>> {
        Box::pin(async move {
            let mut routes: Vec<StoredRoute> = self
                .routes
                .iter()
                .filter(|r| r.vehicle_id == vehicle_id)
                .map(|r| r.value().clone())
                .collect();
            routes.sort_by(|a, b| b.recorded_at_ms.cmp(&a.recorded_at_ms));
            routes.truncate(limit.min(MAX_ROUTE_LIMIT) as usize);
            Ok(routes)
        })
    }

    fn get_route<'a>(&'a self, route_id: &'a str) -> BoxFuture<'a, Result<Option<StoredRoute>, AppError>> {
        Box::pin(async move { Ok(self.routes.get(route_id).map(|r| r.value().clone())) })
    }
}
