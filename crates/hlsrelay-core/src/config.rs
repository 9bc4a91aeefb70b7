//! Application configuration types.
//!
//! The top-level [`Config`] carries all sub-configs for the server, the
//! engine, the output directory, the connectivity probe and stream defaults.
//! Every section defaults sensibly so a completely empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::quality::QualityTier;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub output: OutputConfig,
    pub probe: ProbeConfig,
    pub stream: StreamConfig,
}

impl Config {
    /// Check the configuration for values that would make the relay unusable.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("server.port cannot be 0".into()));
        }
        if self.engine.grace_period_ms == 0 {
            return Err(Error::Config("engine.grace_period_ms cannot be 0".into()));
        }
        if self.probe.timeout_ms == 0 {
            return Err(Error::Config("probe.timeout_ms cannot be 0".into()));
        }
        if self.output.segment_seconds == 0 || self.output.list_size == 0 {
            return Err(Error::Config(
                "output.segment_seconds and output.list_size must be positive".into(),
            ));
        }
        if self.output.playlist_name.is_empty() || self.output.segment_template.is_empty() {
            return Err(Error::Config(
                "output.playlist_name and output.segment_template cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory with dashboard assets served at `/`.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            static_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Transcoding engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Custom path to the engine binary; `PATH` lookup when unset.
    pub ffmpeg_path: Option<PathBuf>,
    /// Wait after the graceful signal before forcing termination.
    pub grace_period_ms: u64,
    /// Wait after the forced kill for the process to be reaped.
    pub kill_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            grace_period_ms: 2000,
            kill_timeout_ms: 3000,
        }
    }
}

impl EngineConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn kill_timeout(&self) -> Duration {
        Duration::from_millis(self.kill_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

/// Segmented output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub playlist_name: String,
    /// printf-style template for numbered segment files.
    pub segment_template: String,
    pub segment_seconds: u32,
    /// Number of segments kept in the rolling playlist.
    pub list_size: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./hls"),
            playlist_name: "stream.m3u8".to_string(),
            segment_template: "segment%03d.ts".to_string(),
            segment_seconds: 2,
            list_size: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// ProbeConfig
// ---------------------------------------------------------------------------

/// Connectivity probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Hard limit on the whole probe run.
    pub timeout_ms: u64,
    /// Seconds of input the trial run reads before exiting.
    pub capture_seconds: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 8000,
            capture_seconds: 2,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// StreamConfig
// ---------------------------------------------------------------------------

/// Defaults applied by the HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Tier used when a start request omits one.
    pub default_quality: QualityTier,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            default_quality: QualityTier::Medium,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.engine.grace_period(), Duration::from_secs(2));
        assert_eq!(cfg.output.playlist_name, "stream.m3u8");
        assert_eq!(cfg.output.list_size, 3);
        assert_eq!(cfg.stream.default_quality, QualityTier::Medium);
    }

    #[test]
    fn empty_json_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.probe.timeout_ms, 8000);
        assert_eq!(cfg.output.segment_template, "segment%03d.ts");
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: Config =
            serde_json::from_str(r#"{"engine": {"grace_period_ms": 500}}"#).unwrap();
        assert_eq!(cfg.engine.grace_period_ms, 500);
        assert_eq!(cfg.engine.kill_timeout_ms, 3000);
        assert!(cfg.engine.ffmpeg_path.is_none());
    }

    #[test]
    fn zero_port_rejected() {
        let mut cfg = Config::default();
        cfg.server.port = 0;
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn zero_grace_rejected() {
        let mut cfg = Config::default();
        cfg.engine.grace_period_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_default_quality_rejected_at_parse() {
        let result: std::result::Result<Config, _> =
            serde_json::from_str(r#"{"stream": {"default_quality": "ultra"}}"#);
        assert!(result.is_err());
    }
}
