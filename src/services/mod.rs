// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod export;
pub mod filter;
pub mod gate;
pub mod geo_math;
pub mod location;
pub mod recorder;
pub mod session;
pub mod simplify;

pub use filter::SignalFilter;
pub use gate::{GateDecision, SampleGate};
pub use location::{ChannelLocationProvider, LocationProvider, PermissionCheck, SamplingConfig};
pub use recorder::{BeginRecording, RecordingManager, RecordingStatus, StartStatus};
pub use session::{RecordingError, RecordingSession, SavedRoute, SessionSnapshot, SessionState};
pub use simplify::simplify_path;
