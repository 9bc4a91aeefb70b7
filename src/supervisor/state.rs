//! Session state record and its published read-only copy.

use chrono::{DateTime, Utc};
use hlsrelay_av::{EngineProcess, Progress};
use hlsrelay_core::{FailureReason, QualityProfile, SessionId};
use serde::Serialize;

/// Lifecycle phase of the relay session.
///
/// `Idle -> Starting -> Running -> {Idle, Failed}`. `Stopping` is entered
/// from `Starting` or `Running` and always resolves to `Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
    Failed,
}

impl SessionPhase {
    /// Whether callers should treat the relay as streaming.
    pub fn is_active(self) -> bool {
        matches!(self, SessionPhase::Starting | SessionPhase::Running)
    }

    /// Whether an engine process handle may be held in this phase.
    pub fn holds_process(self) -> bool {
        matches!(
            self,
            SessionPhase::Starting | SessionPhase::Running | SessionPhase::Stopping
        )
    }
}

/// Immutable facts about one session attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: SessionId,
    pub source: String,
    pub profile: QualityProfile,
    pub started_at: DateTime<Utc>,
}

/// The single mutable session record. Only touched under the supervisor's
/// lock.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub phase: SessionPhase,
    pub info: Option<SessionInfo>,
    pub process: Option<EngineProcess>,
    pub last_error: Option<FailureReason>,
    pub progress: Option<Progress>,
}

impl SessionState {
    pub fn current_id(&self) -> Option<SessionId> {
        self.info.as_ref().map(|i| i.id)
    }

    /// `Idle/Failed -> Starting` with a freshly launched process.
    pub fn begin(&mut self, info: SessionInfo, process: EngineProcess) {
        debug_assert!(self.process.is_none(), "previous engine not torn down");
        self.phase = SessionPhase::Starting;
        self.info = Some(info);
        self.process = Some(process);
        self.last_error = None;
        self.progress = None;
    }

    /// Back to `Idle`, releasing everything.
    pub fn clear(&mut self) {
        self.phase = SessionPhase::Idle;
        self.info = None;
        self.process = None;
        self.last_error = None;
        self.progress = None;
    }

    /// Terminal failure. The session's facts are kept for inspection.
    pub fn fail(&mut self, reason: FailureReason) {
        self.phase = SessionPhase::Failed;
        self.process = None;
        self.last_error = Some(reason);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            info: self.info.clone(),
            pid: self.process.as_ref().and_then(EngineProcess::pid),
            last_error: self.last_error.clone(),
            progress: self.progress.clone(),
        }
    }
}

/// Copy of [`SessionState`] readable without taking the session lock.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub info: Option<SessionInfo>,
    pub pid: Option<u32>,
    pub last_error: Option<FailureReason>,
    pub progress: Option<Progress>,
}
