//! Engine executable discovery.
//!
//! The [`EngineLocator`] resolves the ffmpeg executable once at startup from
//! the configured path or `PATH`, and hands out base [`EngineCommand`]s for
//! sessions and probes.

use std::path::{Path, PathBuf};

use hlsrelay_core::config::EngineConfig;
use serde::{Deserialize, Serialize};

use crate::command::EngineCommand;

/// Name of the engine executable looked up on `PATH`.
const ENGINE_NAME: &str = "ffmpeg";

/// Availability information for the engine, returned by [`EngineLocator::check`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineInfo {
    pub name: String,
    pub available: bool,
    /// First line of `-version` output, if available.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Resolved engine location.
#[derive(Debug, Clone)]
pub struct EngineLocator {
    path: Option<PathBuf>,
}

impl EngineLocator {
    /// Locate the engine.
    ///
    /// A configured `ffmpeg_path` is used when it exists; otherwise
    /// [`which::which`] searches `PATH`. An unresolved engine is not an error
    /// here: sessions fail with a launch error when started.
    pub fn discover(config: &EngineConfig) -> Self {
        let path = match config.ffmpeg_path.as_deref() {
            Some(p) if p.exists() => Some(p.to_path_buf()),
            Some(p) => {
                tracing::warn!(
                    path = %p.display(),
                    "Configured engine path does not exist; searching PATH"
                );
                which::which(ENGINE_NAME).ok()
            }
            None => which::which(ENGINE_NAME).ok(),
        };

        match &path {
            Some(p) => tracing::debug!(path = %p.display(), "Engine located"),
            None => tracing::warn!("{ENGINE_NAME} not found; is it installed and in PATH?"),
        }

        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Base command for the engine. Falls back to the bare name when
    /// discovery failed, so the spawn error names the missing tool.
    pub fn command(&self) -> EngineCommand {
        match &self.path {
            Some(p) => EngineCommand::new(p),
            None => EngineCommand::new(ENGINE_NAME),
        }
    }

    /// Report availability and version.
    pub fn check(&self) -> EngineInfo {
        match &self.path {
            Some(path) => EngineInfo {
                name: ENGINE_NAME.to_string(),
                available: true,
                version: detect_version(path),
                path: Some(path.clone()),
            },
            None => EngineInfo {
                name: ENGINE_NAME.to_string(),
                available: false,
                version: None,
                path: None,
            },
        }
    }
}

/// Run `<engine> -version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn configured_path_wins_when_present() {
        let tmp = TempDir::new().unwrap();
        let fake = tmp.path().join("ffmpeg");
        std::fs::write(&fake, b"").unwrap();

        let locator = EngineLocator::discover(&EngineConfig {
            ffmpeg_path: Some(fake.clone()),
            ..EngineConfig::default()
        });
        assert_eq!(locator.path(), Some(fake.as_path()));
        assert_eq!(locator.command().program(), fake.as_path());
    }

    #[test]
    fn missing_configured_path_falls_back() {
        let locator = EngineLocator::discover(&EngineConfig {
            ffmpeg_path: Some(PathBuf::from("/nonexistent/ffmpeg")),
            ..EngineConfig::default()
        });
        assert_ne!(locator.path(), Some(Path::new("/nonexistent/ffmpeg")));
    }

    #[test]
    fn unresolved_engine_reports_unavailable() {
        let locator = EngineLocator { path: None };
        let info = locator.check();
        assert!(!info.available);
        assert!(info.version.is_none());
        assert_eq!(locator.command().program(), Path::new("ffmpeg"));
    }

    #[cfg(unix)]
    #[test]
    fn version_is_first_stdout_line() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let fake = tmp.path().join("ffmpeg");
        std::fs::write(&fake, "#!/bin/sh\necho 'ffmpeg version 6.1 Copyright'\necho 'built with gcc'\n")
            .unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let info = EngineLocator { path: Some(fake) }.check();
        assert!(info.available);
        assert_eq!(info.version.as_deref(), Some("ffmpeg version 6.1 Copyright"));
    }
}
