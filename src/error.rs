// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::services::session::RecordingError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Recording(#[from] RecordingError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Status and error code for a recording failure.
fn recording_status(err: &RecordingError) -> (StatusCode, &'static str) {
    use RecordingError::*;
    match err {
        PermissionDenied => (StatusCode::FORBIDDEN, "permission_denied"),
        FeatureDisabled(_) => (StatusCode::FORBIDDEN, "recording_disabled"),
        FeatureFlagUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "feature_flag_unavailable"),
        InitialFixUnavailable { .. } => (StatusCode::SERVICE_UNAVAILABLE, "initial_fix_unavailable"),
        StartCancelled => (StatusCode::CONFLICT, "start_cancelled"),
        InsufficientData { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_data"),
        NoCheckpoints => (StatusCode::UNPROCESSABLE_ENTITY, "no_checkpoints"),
        CheckpointRejectedLowAccuracy { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "low_accuracy")
        }
        EmptyCheckpointName => (StatusCode::UNPROCESSABLE_ENTITY, "empty_checkpoint_name"),
        NoCurrentLocation => (StatusCode::UNPROCESSABLE_ENTITY, "no_current_location"),
        InvalidFix => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_fix"),
        CheckpointNotFound(_) => (StatusCode::NOT_FOUND, "checkpoint_not_found"),
        InvalidState(_) => (StatusCode::CONFLICT, "invalid_state"),
        InvalidTrajectory(_) => (StatusCode::INTERNAL_SERVER_ERROR, "invalid_trajectory"),
        PersistenceFailure(_) => (StatusCode::BAD_GATEWAY, "persistence_failure"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),
            AppError::Recording(err) => {
                let (status, code) = recording_status(err);
                if status.is_server_error() {
                    tracing::error!(error = %err, "Recording operation failed");
                }
                (status, code, Some(err.to_string()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
