// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bus stop checkpoints marked during a recording.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A user-marked stop along the recorded route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CheckpointStop {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// 1-based position along the route, contiguous across the list
    pub order: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub timestamp_ms: i64,
}

/// Remove the checkpoint with `id` and renumber the rest from 1.
///
/// Returns the removed checkpoint, or `None` if no checkpoint had that id.
pub fn remove_and_renumber(stops: &mut Vec<CheckpointStop>, id: &str) -> Option<CheckpointStop> {
    let index = stops.iter().position(|s| s.id == id)?;
    let removed = stops.remove(index);
    for (i, stop) in stops.iter_mut().enumerate() {
        stop.order = i as u32 + 1;
    }
    Some(removed)
}
