// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location provider abstraction and the queue-backed provider used for
//! device-pushed fixes.

use crate::models::GpsFix;
use crate::services::geo_math::distance_km;
use futures_util::future::BoxFuture;
use futures_util::stream::{self, BoxStream};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Accuracy level requested from the platform location service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum DesiredAccuracy {
    Balanced,
    High,
    BestForNavigation,
}

/// How often the provider should deliver fixes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SamplingConfig {
    pub desired_accuracy: DesiredAccuracy,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub min_time_interval_ms: i64,
    pub min_distance_m: f64,
}

impl SamplingConfig {
    /// Normal cadence: every 5 s / 10 m.
    pub const NORMAL: SamplingConfig = SamplingConfig {
        desired_accuracy: DesiredAccuracy::BestForNavigation,
        min_time_interval_ms: 5_000,
        min_distance_m: 10.0,
    };

    /// Battery-optimized cadence: every 10 s / 20 m.
    pub const BATTERY_OPTIMIZED: SamplingConfig = SamplingConfig {
        desired_accuracy: DesiredAccuracy::BestForNavigation,
        min_time_interval_ms: 10_000,
        min_distance_m: 20.0,
    };

    pub fn for_mode(battery_optimized: bool) -> Self {
        if battery_optimized {
            Self::BATTERY_OPTIMIZED
        } else {
            Self::NORMAL
        }
    }
}

/// Options for a one-shot fix request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixRequest {
    pub desired_accuracy: DesiredAccuracy,
    pub timeout: Duration,
}

impl FixRequest {
    pub fn navigation(timeout: Duration) -> Self {
        Self {
            desired_accuracy: DesiredAccuracy::BestForNavigation,
            timeout,
        }
    }
}

/// Errors from location providers.
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Timed out waiting for a location fix")]
    Timeout,

    #[error("Location feed closed")]
    FeedClosed,

    #[error("Location provider error: {0}")]
    Provider(String),
}

/// Source of GPS fixes for one recording.
pub trait LocationProvider: Send + Sync {
    /// Fetch a single fix.
    fn current_fix(&self, request: FixRequest) -> BoxFuture<'_, Result<GpsFix, LocationError>>;

    /// Continuous fixes at the requested cadence. Ends when the source closes.
    fn subscribe(&self, config: SamplingConfig) -> BoxStream<'_, GpsFix>;
}

/// Whether the device granted location access.
pub trait PermissionCheck: Send + Sync {
    fn has_location_permission(&self) -> bool;
}

/// Permission as declared by the client when it opened the session.
#[derive(Debug, Clone, Copy)]
pub struct DeclaredPermission(pub bool);

impl PermissionCheck for DeclaredPermission {
    fn has_location_permission(&self) -> bool {
        self.0
    }
}

/// Drops fixes that arrive faster than the sampling cadence allows.
#[derive(Debug, Clone)]
pub struct CadenceThrottle {
    config: SamplingConfig,
    last: Option<GpsFix>,
}

impl CadenceThrottle {
    pub fn new(config: SamplingConfig) -> Self {
        Self { config, last: None }
    }

    /// Admit a fix once both the time and distance intervals have passed.
    pub fn admit(&mut self, fix: &GpsFix) -> bool {
        let admitted = match &self.last {
            None => true,
            Some(prev) => {
                let elapsed = fix.timestamp_ms.saturating_sub(prev.timestamp_ms);
                let moved_m = distance_km(prev.coordinate(), fix.coordinate()) * 1000.0;
                elapsed >= self.config.min_time_interval_ms && moved_m >= self.config.min_distance_m
            }
        };
        if admitted {
            self.last = Some(*fix);
        }
        admitted
    }
}

/// Location provider fed by fixes pushed through an mpsc queue.
///
/// The queue has a single consumer: whichever of `current_fix` or the
/// subscription stream currently holds the receiver lock.
pub struct ChannelLocationProvider {
    rx: Mutex<mpsc::Receiver<GpsFix>>,
}

impl ChannelLocationProvider {
    pub fn new(rx: mpsc::Receiver<GpsFix>) -> Self {
        Self { rx: Mutex::new(rx) }
    }

    /// Create a provider together with the sender that feeds it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<GpsFix>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

impl LocationProvider for ChannelLocationProvider {
    fn current_fix(&self, request: FixRequest) -> BoxFuture<'_, Result<GpsFix, LocationError>> {
        Box::pin(async move {
            let mut rx = self.rx.lock().await;
            match tokio::time::timeout(request.timeout, rx.recv()).await {
                Ok(Some(fix)) => Ok(fix),
                Ok(None) => Err(LocationError::FeedClosed),
                Err(_) => Err(LocationError::Timeout),
            }
        })
    }

    fn subscribe(&self, config: SamplingConfig) -> BoxStream<'_, GpsFix> {
        let throttle = CadenceThrottle::new(config);
        Box::pin(stream::unfold(
            (self, throttle),
            |(provider, mut throttle)| async move {
                loop {
                    let fix = provider.rx.lock().await.recv().await?;
                    if throttle.admit(&fix) {
                        return Some((fix, (provider, throttle)));
                    }
                    tracing::trace!(timestamp_ms = fix.timestamp_ms, "Fix dropped by cadence");
                }
            },
        ))
    }
}
