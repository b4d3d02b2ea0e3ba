// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bus route recorder: records a bus's path from raw GPS fixes.
//!
//! This crate provides the backend that smooths and gates GPS fixes,
//! tracks bus stops marked by the operator, simplifies the finished path
//! and stores it for review.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{RecordingFlags, RouteStore};
use services::RecordingManager;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub flags: Arc<dyn RecordingFlags>,
    pub store: Arc<dyn RouteStore>,
    pub recorder: RecordingManager,
}

impl AppState {
    /// Build state over a storage backend implementing both traits.
    pub fn new<B>(config: Config, backend: Arc<B>) -> Self
    where
        B: RecordingFlags + RouteStore + 'static,
    {
        let flags: Arc<dyn RecordingFlags> = backend.clone();
        let store: Arc<dyn RouteStore> = backend;
        let recorder = RecordingManager::new(config.recorder.clone(), flags.clone(), store.clone());
        Self {
            config,
            flags,
            store,
            recorder,
        }
    }
}
