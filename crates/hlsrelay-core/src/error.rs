//! Unified error type for the relay.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`].

use crate::failure::FailureReason;

/// Unified error type covering the synchronous failure modes of the relay.
///
/// Runtime failures of an already running session are not errors returned to
/// a caller; they surface as [`FailureReason`] in the session status.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller asked for a quality tier outside the fixed set.
    #[error("Unknown quality tier: {0}")]
    UnknownQualityTier(String),

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The transcoding engine process could not be created.
    #[error("Launch failed [{tool}]: {message}")]
    LaunchFailed {
        /// Name of the engine executable.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// A connectivity probe did not complete successfully.
    #[error("Probe failed ({}): {}", .0.kind, .0.message)]
    ProbeFailed(FailureReason),

    /// An external tool returned an error outside of launch/probe.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Configuration could not be parsed or is inconsistent.
    #[error("Config error: {0}")]
    Config(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::UnknownQualityTier(_) => 400,
            Error::Validation(_) => 400,
            Error::LaunchFailed { .. } => 500,
            Error::ProbeFailed(_) => 400,
            Error::Tool { .. } => 502,
            Error::Io { .. } => 500,
            Error::Config(_) => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::UnknownQualityTier(_) => "unknown_quality_tier",
            Error::Validation(_) => "validation_error",
            Error::LaunchFailed { .. } => "launch_failed",
            Error::ProbeFailed(_) => "probe_failed",
            Error::Tool { .. } => "tool_error",
            Error::Io { .. } => "io_error",
            Error::Config(_) => "config_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::LaunchFailed`].
    pub fn launch_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::LaunchFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::FailureKind;

    #[test]
    fn unknown_tier_display() {
        let err = Error::UnknownQualityTier("ultra".into());
        assert_eq!(err.to_string(), "Unknown quality tier: ultra");
        assert_eq!(err.http_status(), 400);
        assert_eq!(err.code(), "unknown_quality_tier");
    }

    #[test]
    fn launch_failed_display() {
        let err = Error::launch_failed("ffmpeg", "No such file or directory");
        assert_eq!(
            err.to_string(),
            "Launch failed [ffmpeg]: No such file or directory"
        );
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn probe_failed_display() {
        let err = Error::ProbeFailed(FailureReason::new(
            FailureKind::ConnectionRefused,
            "Connection refused",
        ));
        assert_eq!(
            err.to_string(),
            "Probe failed (connectionRefused): Connection refused"
        );
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "exit code 1");
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: exit code 1");
        assert_eq!(err.http_status(), 502);
    }
}
