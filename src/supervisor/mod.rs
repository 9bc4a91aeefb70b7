//! Live session supervisor.
//!
//! The [`Supervisor`] owns the single allowed transcoding session. All
//! transitions (`start`, `stop`, and the engine's own lifecycle events) run
//! under one async mutex, so racing callers serialize into
//! teardown-then-replace and never produce two live engine processes.
//!
//! Readers never take that mutex: every completed transition publishes a
//! [`SessionSnapshot`] behind a `parking_lot` lock, which `is_active()` and
//! [`Supervisor::status`] read.
//!
//! Completed transitions are broadcast as [`SessionEvent`]s after the lock
//! is released.

mod state;
mod status;

pub use state::{SessionInfo, SessionPhase, SessionSnapshot};
pub use status::StatusSnapshot;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hlsrelay_av::{args, EngineCommand, EngineEvent, EngineProcess, OutputSink};
use hlsrelay_core::config::EngineConfig;
use hlsrelay_core::{quality, Error, FailureReason, QualityTier, Result, SessionId};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, Mutex};

use state::SessionState;

/// Capacity of the transition notice channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notice of a completed session transition.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    #[serde(rename_all = "camelCase")]
    Started {
        session_id: SessionId,
        source: String,
        quality: QualityTier,
    },
    #[serde(rename_all = "camelCase")]
    Running { session_id: SessionId },
    #[serde(rename_all = "camelCase")]
    Stopped { session_id: SessionId },
    #[serde(rename_all = "camelCase")]
    Failed {
        session_id: SessionId,
        reason: FailureReason,
    },
}

/// Result of [`Supervisor::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NothingToStop,
}

/// Handle to the session supervisor. Cheap to clone.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

struct Inner {
    base: EngineCommand,
    sink: OutputSink,
    grace: Duration,
    kill_timeout: Duration,
    state: Mutex<SessionState>,
    snapshot: RwLock<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
}

impl Supervisor {
    /// `base` is the engine invocation session arguments are appended to.
    pub fn new(base: EngineCommand, sink: OutputSink, engine: &EngineConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                base,
                sink,
                grace: engine.grace_period(),
                kill_timeout: engine.kill_timeout(),
                state: Mutex::new(SessionState::default()),
                snapshot: RwLock::new(SessionSnapshot::default()),
                events,
            }),
        }
    }

    pub fn sink(&self) -> &OutputSink {
        &self.inner.sink
    }

    /// Start streaming `source` at the named quality tier, replacing any
    /// current session.
    ///
    /// Returns as soon as the engine process exists; it does not wait for
    /// output. Blocks for the teardown of a previous session, which is bounded
    /// by the grace period plus the kill timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for an empty source and
    ///   [`Error::UnknownQualityTier`] for a bad tier, before anything is
    ///   touched.
    /// - [`Error::Io`] if the output directory cannot be reset.
    /// - [`Error::LaunchFailed`] if the engine cannot be spawned; the session
    ///   is left `Idle`.
    pub async fn start(&self, source: &str, tier: &str) -> Result<SessionId> {
        if source.trim().is_empty() {
            return Err(Error::Validation("source address is required".into()));
        }
        let profile = quality::resolve(tier)?;

        let mut notices = Vec::new();
        let mut state = self.inner.state.lock().await;

        if let Some(notice) = self.inner.teardown(&mut state).await {
            notices.push(notice);
        }

        if let Err(e) = self.inner.sink.reset() {
            drop(state);
            self.inner.emit(notices);
            tracing::error!(dir = %self.inner.sink.dir().display(), "Failed to reset output directory: {e}");
            return Err(e);
        }

        let mut cmd = self.inner.base.clone();
        cmd.args(args::session_args(source, &profile, &self.inner.sink.layout()));

        let (tx, rx) = mpsc::unbounded_channel();
        let process = match EngineProcess::spawn(&cmd, tx) {
            Ok(process) => process,
            Err(e) => {
                state.clear();
                self.inner.publish(&state);
                drop(state);
                self.inner.emit(notices);
                tracing::error!(source = %source, "Failed to launch engine: {e}");
                return Err(e);
            }
        };

        let id = SessionId::new();
        tracing::info!(
            session_id = %id,
            source = %source,
            quality = %profile.tier,
            pid = ?process.pid(),
            "Session starting"
        );
        tracing::debug!(session_id = %id, command = %cmd, "Engine command");

        state.begin(
            SessionInfo {
                id,
                source: source.to_string(),
                profile,
                started_at: Utc::now(),
            },
            process,
        );
        self.inner.publish(&state);
        drop(state);

        notices.push(SessionEvent::Started {
            session_id: id,
            source: source.to_string(),
            quality: profile.tier,
        });
        self.inner.emit(notices);

        tokio::spawn(forward_events(Arc::clone(&self.inner), id, rx));
        Ok(id)
    }

    /// Stop the current session.
    ///
    /// Idempotent: with no session holding an engine this reports
    /// [`StopOutcome::NothingToStop`] and changes nothing, including a
    /// `Failed` phase.
    pub async fn stop(&self) -> StopOutcome {
        let mut state = self.inner.state.lock().await;
        match self.inner.teardown(&mut state).await {
            Some(notice) => {
                drop(state);
                self.inner.emit(vec![notice]);
                StopOutcome::Stopped
            }
            None => {
                tracing::debug!("Stop requested with no active session");
                StopOutcome::NothingToStop
            }
        }
    }

    /// Stop any session as part of process shutdown.
    pub async fn shutdown(&self) {
        if self.stop().await == StopOutcome::Stopped {
            tracing::info!("Active session stopped for shutdown");
        }
    }

    /// `phase in {Starting, Running}`. Never waits on a transition.
    pub fn is_active(&self) -> bool {
        self.inner.snapshot.read().phase.is_active()
    }

    /// Latest published state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot.read().clone()
    }

    /// Receive notices of completed transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }
}

impl Inner {
    fn publish(&self, state: &SessionState) {
        *self.snapshot.write() = state.snapshot();
    }

    fn emit(&self, notices: Vec<SessionEvent>) {
        for notice in notices {
            // No subscribers is fine.
            let _ = self.events.send(notice);
        }
    }

    /// Stop the engine held by `state`, if any, and return to `Idle`.
    ///
    /// The graceful stop and the forced kill after it are driven by the
    /// engine's reaper. If this future is dropped part-way, the engine still
    /// goes down and its exit event finishes the move to `Idle` in
    /// [`handle_event`](Self::handle_event).
    async fn teardown(&self, state: &mut SessionState) -> Option<SessionEvent> {
        if !state.phase.holds_process() {
            return None;
        }

        let session_id = state.current_id();
        state.phase = SessionPhase::Stopping;
        self.publish(state);

        if let Some(id) = session_id {
            tracing::info!(session_id = %id, "Stopping session");
        }

        if let Some(process) = state.process.as_ref() {
            match process.shutdown(self.grace, self.kill_timeout).await {
                Some(report) => tracing::debug!(
                    session_id = ?session_id,
                    code = ?report.code,
                    signal = ?report.signal,
                    forced = report.forced,
                    "Engine stopped"
                ),
                None => tracing::error!(
                    pid = ?process.pid(),
                    "Engine not confirmed dead; releasing handle"
                ),
            }
        }

        state.clear();
        self.publish(state);

        session_id.map(|id| {
            tracing::info!(session_id = %id, "Session stopped");
            SessionEvent::Stopped { session_id: id }
        })
    }

    /// Apply one engine lifecycle event for session `id`.
    async fn handle_event(&self, id: SessionId, event: EngineEvent) {
        let mut state = self.state.lock().await;
        if state.current_id() != Some(id) {
            tracing::trace!(session_id = %id, "Dropping event for superseded session");
            return;
        }

        let notice = match event {
            EngineEvent::Launched { pid } => {
                if state.phase != SessionPhase::Starting {
                    return;
                }
                state.phase = SessionPhase::Running;
                tracing::info!(session_id = %id, pid = ?pid, "Session running");
                Some(SessionEvent::Running { session_id: id })
            }
            EngineEvent::Progress(progress) => {
                if !state.phase.is_active() {
                    return;
                }
                state.progress = Some(progress);
                None
            }
            EngineEvent::Exited(report) if state.phase == SessionPhase::Stopping => {
                // Reached only when the teardown's caller gave up waiting.
                tracing::info!(
                    session_id = %id,
                    code = ?report.code,
                    signal = ?report.signal,
                    forced = report.forced,
                    "Session stopped"
                );
                state.clear();
                Some(SessionEvent::Stopped { session_id: id })
            }
            EngineEvent::Exited(report) => {
                if !state.phase.is_active() {
                    return;
                }
                if report.success() {
                    tracing::info!(session_id = %id, "Engine finished; session ended");
                    state.clear();
                    Some(SessionEvent::Stopped { session_id: id })
                } else {
                    let reason = report.classify();
                    tracing::error!(
                        session_id = %id,
                        kind = %reason.kind,
                        code = ?reason.exit_code,
                        signal = ?reason.signal,
                        "Session failed: {}",
                        reason.message
                    );
                    state.fail(reason.clone());
                    Some(SessionEvent::Failed {
                        session_id: id,
                        reason,
                    })
                }
            }
        };

        self.publish(&state);
        drop(state);
        self.emit(notice.into_iter().collect());
    }
}

/// Deliver one engine's events into the supervisor, in order.
async fn forward_events(
    inner: Arc<Inner>,
    id: SessionId,
    mut rx: mpsc::UnboundedReceiver<EngineEvent>,
) {
    while let Some(event) = rx.recv().await {
        inner.handle_event(id, event).await;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use hlsrelay_core::config::OutputConfig;
    use tempfile::TempDir;

    fn supervisor_with(script: &str, dir: &TempDir) -> Supervisor {
        let mut base = EngineCommand::new("/bin/sh");
        base.arg("-c").arg(script).arg("engine");
        let sink = OutputSink::new(&OutputConfig {
            dir: dir.path().join("hls"),
            ..OutputConfig::default()
        });
        let engine = EngineConfig {
            grace_period_ms: 500,
            kill_timeout_ms: 2000,
            ..EngineConfig::default()
        };
        Supervisor::new(base, sink, &engine)
    }

    #[tokio::test]
    async fn rejects_bad_input_before_touching_anything() {
        let tmp = TempDir::new().unwrap();
        let sup = supervisor_with("exec sleep 30", &tmp);

        assert!(matches!(
            sup.start("rtsp://cam/live", "ultra").await,
            Err(Error::UnknownQualityTier(_))
        ));
        assert!(matches!(sup.start("  ", "low").await, Err(Error::Validation(_))));
        assert!(!tmp.path().join("hls").exists());
        assert_eq!(sup.snapshot().phase, SessionPhase::Idle);
    }

    #[tokio::test]
    async fn start_then_stop() {
        let tmp = TempDir::new().unwrap();
        let sup = supervisor_with("exec sleep 30", &tmp);
        let mut notices = sup.subscribe();

        let id = sup.start("rtsp://cam/live", "medium").await.unwrap();
        assert!(sup.is_active());
        assert!(matches!(
            notices.recv().await.unwrap(),
            SessionEvent::Started { session_id, .. } if session_id == id
        ));

        assert_eq!(sup.stop().await, StopOutcome::Stopped);
        assert!(!sup.is_active());
        assert_eq!(sup.snapshot().phase, SessionPhase::Idle);
        assert_eq!(sup.stop().await, StopOutcome::NothingToStop);
    }

    #[tokio::test]
    async fn clean_exit_returns_to_idle() {
        let tmp = TempDir::new().unwrap();
        let sup = supervisor_with("exit 0", &tmp);
        let mut notices = sup.subscribe();

        let id = sup.start("rtsp://cam/live", "low").await.unwrap();
        loop {
            let notice = tokio::time::timeout(Duration::from_secs(5), notices.recv())
                .await
                .expect("no stop notice")
                .unwrap();
            if let SessionEvent::Stopped { session_id } = notice {
                assert_eq!(session_id, id);
                break;
            }
        }
        assert_eq!(sup.snapshot().phase, SessionPhase::Idle);
        assert!(sup.snapshot().last_error.is_none());
    }

    #[test]
    fn notices_serialize_with_event_tag() {
        let id = SessionId::new();
        let json = serde_json::to_value(SessionEvent::Running { session_id: id }).unwrap();
        assert_eq!(json["event"], "running");
        assert_eq!(json["sessionId"], id.to_string());
    }
}
