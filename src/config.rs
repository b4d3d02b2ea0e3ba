// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use crate::services::simplify::DEFAULT_TOLERANCE_DEG;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which backend stores routes and recording flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StorageBackend::Firestore),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(ConfigError::Invalid("STORAGE_BACKEND", s.to_string())),
        }
    }
}

/// Tunables for recording sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderSettings {
    /// Attempts to obtain a usable initial fix
    pub acquisition_attempts: u32,
    /// Wait between initial fix attempts
    pub acquisition_backoff: Duration,
    /// Initial fixes must be more accurate than this (meters)
    pub acquisition_max_accuracy_m: f64,
    /// How long one fix request waits for the device
    pub fix_timeout: Duration,
    /// Douglas-Peucker tolerance (degrees)
    pub simplify_tolerance_deg: f64,
    /// Points required before a recording can be saved
    pub min_points_to_save: usize,
    /// Raw fixes retained for diagnostics
    pub recent_fix_capacity: usize,
    /// Per-session fix queue depth
    pub fix_queue_capacity: usize,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            acquisition_attempts: 3,
            acquisition_backoff: Duration::from_secs(2),
            acquisition_max_accuracy_m: 100.0,
            fix_timeout: Duration::from_secs(15),
            simplify_tolerance_deg: DEFAULT_TOLERANCE_DEG,
            min_points_to_save: 2,
            recent_fix_capacity: 10,
            fix_queue_capacity: 256,
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend/app origin allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Route and flag storage
    pub storage_backend: StorageBackend,
    /// Recording session tunables
    pub recorder: RecorderSettings,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:8081".to_string(),
            gcp_project_id: "test-project".to_string(),
            storage_backend: StorageBackend::Memory,
            recorder: RecorderSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = RecorderSettings::default();
        let recorder = RecorderSettings {
            simplify_tolerance_deg: parse_var(
                "SIMPLIFY_TOLERANCE_DEG",
                defaults.simplify_tolerance_deg,
            )?,
            fix_timeout: Duration::from_secs(parse_var(
                "FIX_TIMEOUT_SECS",
                defaults.fix_timeout.as_secs(),
            )?),
            acquisition_backoff: Duration::from_millis(parse_var(
                "ACQUISITION_BACKOFF_MS",
                defaults.acquisition_backoff.as_millis() as u64,
            )?),
            fix_queue_capacity: parse_var("FIX_QUEUE_CAPACITY", defaults.fix_queue_capacity)?,
            ..defaults
        };

        if !(recorder.simplify_tolerance_deg >= 0.0) {
            return Err(ConfigError::Invalid(
                "SIMPLIFY_TOLERANCE_DEG",
                recorder.simplify_tolerance_deg.to_string(),
            ));
        }
        if recorder.fix_queue_capacity == 0 {
            return Err(ConfigError::Invalid("FIX_QUEUE_CAPACITY", "0".to_string()));
        }

        Ok(Self {
            port: parse_var("PORT", 8080)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            storage_backend: env::var("STORAGE_BACKEND")
                .unwrap_or_else(|_| "firestore".to_string())
                .parse()?,
            recorder,
        })
    }
}

/// Read an optional variable, falling back to `default` when unset.
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => Ok(value),
            Err(_) => Err(ConfigError::Invalid(name, raw)),
        },
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
