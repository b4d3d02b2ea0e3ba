// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Hosting for concurrent recording sessions.
//!
//! Each session gets one background task. The task runs `start()` against a
//! queue-fed location provider, then drains the queue into `on_fix()` at the
//! current sampling cadence. Callers reach the session through its mutex, so
//! fix handling and user commands are serialized per session.

use crate::config::RecorderSettings;
use crate::db::{RecordingFlags, RouteStore};
use crate::error::AppError;
use crate::models::GpsFix;
use crate::services::location::{
    ChannelLocationProvider, DeclaredPermission, LocationProvider, SamplingConfig,
};
use crate::services::session::{
    cancelled, RecordingError, RecordingSession, SavedRoute, SessionSnapshot, SessionState,
};
use dashmap::DashMap;
use futures_util::StreamExt;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex, MutexGuard};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub type SharedSession = Arc<Mutex<RecordingSession>>;

/// Progress of the background start for a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum StartStatus {
    /// Waiting for a usable initial fix
    Starting,
    Started,
    Failed { error: String },
}

/// Live status of a hosted session.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecordingStatus {
    pub session_id: String,
    pub start: StartStatus,
    /// Absent while the initial fix is being acquired
    pub session: Option<SessionSnapshot>,
}

/// Request to open a recording.
#[derive(Debug, Clone)]
pub struct BeginRecording {
    pub vehicle_id: String,
    pub operator_id: String,
    pub location_permission: bool,
    pub battery_optimized: bool,
}

/// Handle to one hosted session.
struct RecordingHandle {
    vehicle_id: String,
    session: SharedSession,
    fixes: mpsc::Sender<GpsFix>,
    cancel: watch::Sender<bool>,
    cadence: watch::Sender<SamplingConfig>,
    start: watch::Receiver<StartStatus>,
}

impl RecordingHandle {
    /// Lock the session once the start phase is over.
    async fn lock_started(&self) -> Result<MutexGuard<'_, RecordingSession>, RecordingError> {
        if *self.start.borrow() == StartStatus::Starting {
            return Err(RecordingError::InvalidState(SessionState::Idle));
        }
        Ok(self.session.lock().await)
    }

    /// Whether this session still holds its vehicle.
    async fn is_active(&self) -> bool {
        let start = self.start.borrow().clone();
        match start {
            StartStatus::Starting => return true,
            StartStatus::Failed { .. } => return false,
            StartStatus::Started => {}
        }
        matches!(
            self.session.lock().await.state(),
            SessionState::Recording | SessionState::PendingSave
        )
    }
}

/// Registry of live recording sessions.
pub struct RecordingManager {
    sessions: DashMap<String, Arc<RecordingHandle>>,
    settings: RecorderSettings,
    flags: Arc<dyn RecordingFlags>,
    store: Arc<dyn RouteStore>,
    next_seq: AtomicU64,
    /// Held across the per-vehicle check and the insert in `begin`
    begin_lock: Mutex<()>,
}

impl RecordingManager {
    pub fn new(
        settings: RecorderSettings,
        flags: Arc<dyn RecordingFlags>,
        store: Arc<dyn RouteStore>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            settings,
            flags,
            store,
            next_seq: AtomicU64::new(1),
            begin_lock: Mutex::new(()),
        }
    }

    /// Open a session and start it in the background.
    ///
    /// Returns the session ID and the initial sampling cadence. Start
    /// failures surface through `status()`.
    pub async fn begin(&self, request: BeginRecording) -> Result<(String, SamplingConfig), AppError> {
        let _guard = self.begin_lock.lock().await;
        self.release_vehicle(&request.vehicle_id).await?;

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let session_id = format!("rec-{}-{}", chrono::Utc::now().timestamp_millis(), seq);

        let mut session = RecordingSession::new(
            request.vehicle_id.clone(),
            request.operator_id.clone(),
            self.settings.clone(),
        );
        let sampling = session.set_battery_optimized(request.battery_optimized)?;
        let session = Arc::new(Mutex::new(session));

        let (fixes, provider) = ChannelLocationProvider::channel(self.settings.fix_queue_capacity);
        let (cancel, cancel_rx) = watch::channel(false);
        let (cadence, cadence_rx) = watch::channel(sampling);
        let (start_tx, start) = watch::channel(StartStatus::Starting);

        let handle = Arc::new(RecordingHandle {
            vehicle_id: request.vehicle_id.clone(),
            session: session.clone(),
            fixes,
            cancel,
            cadence,
            start,
        });
        self.sessions.insert(session_id.clone(), handle);

        let worker = SessionWorker {
            session_id: session_id.clone(),
            session,
            provider,
            permission: DeclaredPermission(request.location_permission),
            flags: self.flags.clone(),
            cancel: cancel_rx,
            cadence: cadence_rx,
            start: start_tx,
        };
        tokio::spawn(worker.run());

        tracing::info!(
            session_id = %session_id,
            vehicle_id = %request.vehicle_id,
            operator_id = %request.operator_id,
            battery_optimized = request.battery_optimized,
            "Recording session opened"
        );
        Ok((session_id, sampling))
    }

    /// Refuse a second live session for the same vehicle; drop dead ones.
    async fn release_vehicle(&self, vehicle_id: &str) -> Result<(), AppError> {
        let existing: Vec<(String, Arc<RecordingHandle>)> = self
            .sessions
            .iter()
            .filter(|e| e.value().vehicle_id == vehicle_id)
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        for (id, handle) in existing {
            if handle.is_active().await {
                return Err(AppError::Conflict(format!(
                    "Vehicle {} already has recording session {}",
                    vehicle_id, id
                )));
            }
            let _ = handle.cancel.send(true);
            self.sessions.remove(&id);
        }
        Ok(())
    }

    fn handle(&self, session_id: &str) -> Result<Arc<RecordingHandle>, AppError> {
        self.sessions
            .get(session_id)
            .map(|h| h.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("Recording session {}", session_id)))
    }

    /// Shared session, for callers that need direct access.
    pub fn session(&self, session_id: &str) -> Result<SharedSession, AppError> {
        Ok(self.handle(session_id)?.session.clone())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub async fn status(&self, session_id: &str) -> Result<RecordingStatus, AppError> {
        let handle = self.handle(session_id)?;
        let start = handle.start.borrow().clone();
        let session = match start {
            StartStatus::Starting => None,
            _ => Some(handle.session.lock().await.snapshot()),
        };
        Ok(RecordingStatus {
            session_id: session_id.to_string(),
            start,
            session,
        })
    }

    /// Wait until the background start has finished.
    pub async fn wait_started(&self, session_id: &str) -> Result<StartStatus, AppError> {
        let mut start = self.handle(session_id)?.start.clone();
        let status = start
            .wait_for(|s| *s != StartStatus::Starting)
            .await
            .map_err(|_| AppError::Conflict("Session worker exited".to_string()))?
            .clone();
        Ok(status)
    }

    /// Queue raw fixes for the session. Returns how many were queued.
    pub fn push_fixes(&self, session_id: &str, fixes: Vec<GpsFix>) -> Result<usize, AppError> {
        let handle = self.handle(session_id)?;
        let mut queued = 0;
        for fix in fixes {
            match handle.fixes.try_send(fix) {
                Ok(()) => queued += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(session_id, queued, "Fix queue full; dropping remaining fixes");
                    break;
                }
                Err(TrySendError::Closed(_)) => {
                    return Err(AppError::Conflict(
                        "Session is no longer accepting fixes".to_string(),
                    ));
                }
            }
        }
        Ok(queued)
    }

    pub async fn mark_checkpoint(
        &self,
        session_id: &str,
        name: &str,
    ) -> Result<crate::models::CheckpointStop, AppError> {
        let handle = self.handle(session_id)?;
        let mut session = handle.lock_started().await?;
        Ok(session.mark_checkpoint(name)?)
    }

    pub async fn remove_checkpoint(
        &self,
        session_id: &str,
        checkpoint_id: &str,
    ) -> Result<crate::models::CheckpointStop, AppError> {
        let handle = self.handle(session_id)?;
        let mut session = handle.lock_started().await?;
        Ok(session.remove_checkpoint(checkpoint_id)?)
    }

    /// Switch battery mode and resubscribe the worker at the new cadence.
    pub async fn set_battery_optimized(
        &self,
        session_id: &str,
        enabled: bool,
    ) -> Result<SamplingConfig, AppError> {
        let handle = self.handle(session_id)?;
        let config = handle.lock_started().await?.set_battery_optimized(enabled)?;
        handle.cadence.send_replace(config);
        Ok(config)
    }

    /// Stop and save. The session lock is held across the save.
    pub async fn stop(&self, session_id: &str, save_without_stops: bool) -> Result<SavedRoute, AppError> {
        let handle = self.handle(session_id)?;
        let saved = {
            let mut session = handle.lock_started().await?;
            session.stop(save_without_stops, self.store.as_ref()).await?
        };

        let _ = handle.cancel.send(true);
        self.sessions.remove(session_id);
        Ok(saved)
    }

    /// Cancel the session, interrupting an in-flight start.
    pub async fn cancel(&self, session_id: &str) -> Result<(), AppError> {
        let handle = self.handle(session_id)?;
        let _ = handle.cancel.send(true);

        let result = handle.session.lock().await.cancel();
        self.sessions.remove(session_id);
        result.map_err(AppError::from)
    }
}

/// Background task driving one session.
struct SessionWorker {
    session_id: String,
    session: SharedSession,
    provider: ChannelLocationProvider,
    permission: DeclaredPermission,
    flags: Arc<dyn RecordingFlags>,
    cancel: watch::Receiver<bool>,
    cadence: watch::Receiver<SamplingConfig>,
    start: watch::Sender<StartStatus>,
}

impl SessionWorker {
    async fn run(mut self) {
        let started = {
            let mut session = self.session.lock().await;
            session
                .start(
                    &self.provider,
                    &self.permission,
                    self.flags.as_ref(),
                    &mut self.cancel,
                )
                .await
        };

        match started {
            Ok(_) => {
                self.start.send_replace(StartStatus::Started);
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "Recording failed to start");
                self.start.send_replace(StartStatus::Failed {
                    error: e.to_string(),
                });
                return;
            }
        }

        self.consume().await;
        tracing::debug!(session_id = %self.session_id, "Session worker exited");
    }

    /// Drain the fix queue until the session stops recording.
    async fn consume(&mut self) {
        loop {
            let config = *self.cadence.borrow_and_update();
            let mut fixes = self.provider.subscribe(config);

            loop {
                tokio::select! {
                    _ = cancelled(&mut self.cancel) => return,
                    changed = self.cadence.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        tracing::debug!(session_id = %self.session_id, "Resubscribing at new cadence");
                        break;
                    }
                    next = fixes.next() => {
                        let Some(fix) = next else { return };
                        let mut session = self.session.lock().await;
                        if session.state() != SessionState::Recording {
                            return;
                        }
                        if let Err(e) = session.on_fix(fix) {
                            tracing::warn!(session_id = %self.session_id, error = %e, "Fix rejected");
                        }
                    }
                }
            }
        }
    }
}
