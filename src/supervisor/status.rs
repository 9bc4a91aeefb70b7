//! Read-only status projection.

use hlsrelay_av::Progress;
use hlsrelay_core::{FailureReason, QualityTier, SessionId};
use serde::Serialize;

use super::{SessionPhase, Supervisor};

/// What a polling client sees.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub phase: SessionPhase,
    pub is_active: bool,
    pub has_ready_output: bool,
    /// Seconds since the session entered `Starting`; zero when no engine is
    /// held.
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<FailureReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
}

impl Supervisor {
    /// Current status. Never waits on a transition in progress.
    pub fn status(&self) -> StatusSnapshot {
        let snap = self.snapshot();

        let uptime_seconds = match &snap.info {
            Some(info) if snap.phase.holds_process() => {
                (chrono::Utc::now() - info.started_at).num_seconds().max(0) as u64
            }
            _ => 0,
        };

        StatusSnapshot {
            phase: snap.phase,
            is_active: snap.phase.is_active(),
            has_ready_output: self.sink().has_ready_output(),
            uptime_seconds,
            session_id: snap.info.as_ref().map(|i| i.id),
            source: snap.info.as_ref().map(|i| i.source.clone()),
            quality: snap.info.as_ref().map(|i| i.profile.tier),
            pid: snap.pid,
            last_error: snap.last_error,
            progress: snap.progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hlsrelay_av::{EngineCommand, OutputSink};
    use hlsrelay_core::config::{EngineConfig, OutputConfig};
    use tempfile::TempDir;

    #[test]
    fn idle_status() {
        let tmp = TempDir::new().unwrap();
        let sink = OutputSink::new(&OutputConfig {
            dir: tmp.path().to_path_buf(),
            ..OutputConfig::default()
        });
        let sup = Supervisor::new(EngineCommand::new("ffmpeg"), sink, &EngineConfig::default());

        let status = sup.status();
        assert_eq!(status.phase, SessionPhase::Idle);
        assert!(!status.is_active);
        assert!(!status.has_ready_output);
        assert_eq!(status.uptime_seconds, 0);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["phase"], "Idle");
        assert_eq!(json["isActive"], false);
        assert!(json.get("sessionId").is_none());
    }
}
