// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod checkpoint;
pub mod fix;
pub mod quality;
pub mod route;

pub use checkpoint::CheckpointStop;
pub use fix::{Coordinate, GpsFix, TrajectoryPoint};
pub use quality::{QualityTier, Thresholds};
pub use route::{RecordedRoute, RouteStatus, RouteSummary, StoredRoute};
