//! Failure classification for engine runs.
//!
//! The engine is opaque: the only feedback is its exit code, the signal that
//! terminated it and whatever it wrote to stderr. [`classify`] turns that
//! into a [`FailureReason`] with one of a small set of [`FailureKind`]s.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of an engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    Timeout,
    ConnectionRefused,
    ProtocolError,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::ConnectionRefused => "connectionRefused",
            FailureKind::ProtocolError => "protocolError",
            FailureKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure together with the evidence it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReason {
    pub kind: FailureKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
}

impl FailureReason {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            exit_code: None,
            signal: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }
}

/// Diagnostic fragments mapped to a failure kind. Matched case-insensitively,
/// first hit wins.
const PATTERNS: &[(&str, FailureKind)] = &[
    ("connection refused", FailureKind::ConnectionRefused),
    ("timed out", FailureKind::Timeout),
    ("timeout", FailureKind::Timeout),
    ("invalid data found", FailureKind::ProtocolError),
    ("protocol not found", FailureKind::ProtocolError),
    ("method describe failed", FailureKind::ProtocolError),
    ("unrecognized option", FailureKind::ProtocolError),
    ("server returned 4", FailureKind::ProtocolError),
    ("server returned 5", FailureKind::ProtocolError),
    ("404 not found", FailureKind::ProtocolError),
    ("401 unauthorized", FailureKind::ProtocolError),
    ("invalid argument", FailureKind::ProtocolError),
];

/// Classify an abnormal engine exit.
///
/// An exit by signal is always [`FailureKind::Unknown`]: the engine was
/// killed from outside and its output says nothing about the source.
/// Otherwise `diagnostics`, the tail of the engine's stderr with the oldest
/// line first, is scanned newest first.
pub fn classify(exit_code: Option<i32>, signal: Option<i32>, diagnostics: &[String]) -> FailureReason {
    if let Some(sig) = signal {
        return FailureReason {
            kind: FailureKind::Unknown,
            message: format!("terminated by signal {sig}"),
            exit_code,
            signal,
        };
    }

    let matched = diagnostics.iter().rev().find_map(|line| {
        let lower = line.to_ascii_lowercase();
        PATTERNS
            .iter()
            .find(|(needle, _)| lower.contains(needle))
            .map(|(_, kind)| (*kind, line.trim().to_string()))
    });

    let (kind, message) = match matched {
        Some(hit) => hit,
        None => {
            let last = diagnostics
                .iter()
                .rev()
                .map(|l| l.trim())
                .find(|l| !l.is_empty());
            let message = match (last, exit_code) {
                (Some(line), _) => line.to_string(),
                (None, Some(code)) => format!("exited with code {code}"),
                (None, None) => "exited abnormally".to_string(),
            };
            (FailureKind::Unknown, message)
        }
    };

    FailureReason {
        kind,
        message,
        exit_code,
        signal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn connection_refused() {
        let diag = lines(&[
            "ffmpeg version 6.1",
            "[tcp @ 0x55] Connection to tcp://10.0.0.5:554?timeout=0 failed: Connection refused",
            "rtsp://10.0.0.5/live: Connection refused",
        ]);
        let r = classify(Some(1), None, &diag);
        assert_eq!(r.kind, FailureKind::ConnectionRefused);
        assert_eq!(r.exit_code, Some(1));
        assert!(r.message.contains("Connection refused"));
    }

    #[test]
    fn timeout() {
        let diag = lines(&["rtsp://cam/stream: Connection timed out"]);
        assert_eq!(classify(Some(1), None, &diag).kind, FailureKind::Timeout);
    }

    #[test]
    fn protocol_errors() {
        for line in [
            "bad://address: Protocol not found",
            "rtsp://cam: Invalid data found when processing input",
            "method DESCRIBE failed: 404 Not Found",
            "Unrecognized option 'hls_segment_type'.",
            "Server returned 401 Unauthorized (authorization failed)",
        ] {
            let r = classify(Some(1), None, &lines(&[line]));
            assert_eq!(r.kind, FailureKind::ProtocolError, "line: {line}");
        }
    }

    #[test]
    fn newest_line_wins() {
        let diag = lines(&[
            "Connection timed out, retrying",
            "rtsp://cam: Connection refused",
        ]);
        assert_eq!(
            classify(Some(1), None, &diag).kind,
            FailureKind::ConnectionRefused
        );
    }

    #[test]
    fn unknown_uses_last_line() {
        let diag = lines(&["something odd happened", "  ", ""]);
        let r = classify(Some(255), None, &diag);
        assert_eq!(r.kind, FailureKind::Unknown);
        assert_eq!(r.message, "something odd happened");
    }

    #[test]
    fn unknown_signal_without_output() {
        let r = classify(None, Some(9), &[]);
        assert_eq!(r.kind, FailureKind::Unknown);
        assert_eq!(r.signal, Some(9));
        assert_eq!(r.message, "terminated by signal 9");
    }

    #[test]
    fn signal_takes_precedence_over_output() {
        let diag = lines(&["rtsp://cam: Connection refused"]);
        let r = classify(None, Some(15), &diag);
        assert_eq!(r.kind, FailureKind::Unknown);
        assert_eq!(r.message, "terminated by signal 15");
    }

    #[test]
    fn kind_serializes_camel_case() {
        let json = serde_json::to_string(&FailureKind::ConnectionRefused).unwrap();
        assert_eq!(json, "\"connectionRefused\"");
    }
}
