// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Vehicles (route recording feature flag)
//! - Recorded routes (pending review)

use crate::db::{collections, RecordingFlags, RouteStore, MAX_ROUTE_LIMIT};
use crate::error::AppError;
use crate::models::route::{route_document_id, VehicleRecordingFlag};
use crate::models::{RecordedRoute, StoredRoute};
use crate::time_utils::now_rfc3339;
use futures_util::future::BoxFuture;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // The emulator accepts any bearer token.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Vehicle Operations ──────────────────────────────────────

    /// Read the recording flag. A missing vehicle document means disabled.
    pub async fn get_recording_flag(&self, vehicle_id: &str) -> Result<bool, AppError> {
        let flag: Option<VehicleRecordingFlag> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::VEHICLES)
            .obj()
            .one(vehicle_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(flag.is_some_and(|f| f.route_recording_enabled))
    }

    /// Set the recording flag, leaving other vehicle fields untouched.
    pub async fn set_recording_flag(&self, vehicle_id: &str, enabled: bool) -> Result<(), AppError> {
        let flag = VehicleRecordingFlag {
            route_recording_enabled: enabled,
            updated_at: Some(now_rfc3339()),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(firestore::paths!(VehicleRecordingFlag::{
                route_recording_enabled,
                updated_at
            }))
            .in_col(collections::VEHICLES)
            .document_id(vehicle_id)
            .object(&flag)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(vehicle_id, enabled, "Updated route recording flag");
        Ok(())
    }

    // ─── Recorded Route Operations ───────────────────────────────

    /// Store a recorded route as a pending document.
    pub async fn insert_route(&self, route: &RecordedRoute) -> Result<String, AppError> {
        let id = route_document_id(&route.vehicle_id, route.recorded_at_ms);
        let stored = StoredRoute::pending(id.clone(), route.clone(), now_rfc3339());

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::RECORDED_ROUTES)
            .document_id(&id)
            .object(&stored)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(route_id = %id, "Stored recorded route");
        Ok(id)
    }

    /// Get routes for a vehicle, newest recording first.
    pub async fn get_routes_for_vehicle(
        &self,
        vehicle_id: &str,
        limit: u32,
    ) -> Result<Vec<StoredRoute>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::RECORDED_ROUTES)
            .filter(|q| q.for_all([q.field("vehicle_id").eq(vehicle_id)]))
            .order_by([(
                "recorded_at_ms",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit.min(MAX_ROUTE_LIMIT))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a stored route by document ID.
    pub async fn get_stored_route(&self, route_id: &str) -> Result<Option<StoredRoute>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::RECORDED_ROUTES)
            .obj()
            .one(route_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

impl RecordingFlags for FirestoreDb {
    fn is_recording_enabled<'a>(&'a self, vehicle_id: &'a str) -> BoxFuture<'a, Result<bool, AppError>> {
        Box::pin(self.get_recording_flag(vehicle_id))
    }

    fn set_recording_enabled<'a>(
        &'a self,
        vehicle_id: &'a str,
        enabled: bool,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(self.set_recording_flag(vehicle_id, enabled))
    }
}

impl RouteStore for FirestoreDb {
    fn save_route<'a>(&'a self, route: &'a RecordedRoute) -> BoxFuture<'a, Result<String, AppError>> {
        Box::pin(self.insert_route(route))
    }

    fn recent_routes<'a>(
        &'a self,
        vehicle_id: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<StoredRoute>, AppError>> {
        Box::pin(self.get_routes_for_vehicle(vehicle_id, limit))
    }

    fn get_route<'a>(&'a self, route_id: &'a str) -> BoxFuture<'a, Result<Option<StoredRoute>, AppError>> {
        Box::pin(self.get_stored_route(route_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_reports_offline() {
        let db = FirestoreDb::new_mock();
        let err = db.is_recording_enabled("bus-1").await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
