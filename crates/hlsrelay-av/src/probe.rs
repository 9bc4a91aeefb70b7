//! Connectivity probe.
//!
//! A probe is a short trial run of the engine against a candidate source:
//! read a couple of seconds of input, discard it, exit. It shares nothing with
//! the live session, so it can run while a session is active.

use hlsrelay_core::config::ProbeConfig;
use hlsrelay_core::failure::{self, FailureKind, FailureReason};
use hlsrelay_core::{Error, Result};

use crate::args::probe_args;
use crate::command::EngineCommand;

/// Time-bounded reachability check for a source address.
#[derive(Debug, Clone)]
pub struct ConnectivityProbe {
    base: EngineCommand,
    config: ProbeConfig,
}

impl ConnectivityProbe {
    /// `base` is the engine invocation that probe arguments are appended to.
    pub fn new(base: EngineCommand, config: ProbeConfig) -> Self {
        Self { base, config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Check that `source` can be opened and read.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for an empty source; otherwise
    /// [`Error::ProbeFailed`] with a classified reason. Exceeding the
    /// configured timeout is always [`FailureKind::Timeout`].
    pub async fn probe(&self, source: &str) -> Result<()> {
        if source.trim().is_empty() {
            return Err(Error::Validation("source address is required".into()));
        }

        let mut cmd = self.base.clone();
        cmd.args(probe_args(source, self.config.capture_seconds))
            .timeout(self.config.timeout());

        tracing::info!(source = %source, timeout_ms = self.config.timeout_ms, "Probing source");

        let output = match cmd.run().await {
            Ok(Some(output)) => output,
            Ok(None) => {
                let reason = FailureReason::timeout(format!(
                    "no response from source within {} ms",
                    self.config.timeout_ms
                ));
                tracing::warn!(source = %source, "Probe timed out");
                return Err(Error::ProbeFailed(reason));
            }
            Err(e) => {
                tracing::error!(source = %source, "Probe could not run: {e}");
                return Err(Error::ProbeFailed(FailureReason::new(
                    FailureKind::Unknown,
                    e.to_string(),
                )));
            }
        };

        if output.status.success() {
            tracing::info!(source = %source, "Probe succeeded");
            return Ok(());
        }

        let diagnostics: Vec<String> = output
            .stderr
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        let reason = failure::classify(output.status.code(), exit_signal(&output.status), &diagnostics);
        tracing::warn!(
            source = %source,
            kind = %reason.kind,
            code = ?reason.exit_code,
            "Probe failed: {}",
            reason.message
        );
        Err(Error::ProbeFailed(reason))
    }
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}
