//! Parsing of the engine's periodic progress lines.
//!
//! ffmpeg reports progress on stderr as `key= value` pairs, e.g.
//! `frame=  123 fps= 30 q=-1.0 size=N/A time=00:00:04.10 bitrate=N/A speed=1.01x`.

use serde::Serialize;

/// One parsed progress report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub frames: Option<u64>,
    pub fps: Option<f64>,
    pub timemark: Option<String>,
    pub bitrate: Option<String>,
    pub speed: Option<String>,
}

impl Progress {
    /// Parse a progress line. Returns `None` for any other stderr output.
    pub fn parse(line: &str) -> Option<Self> {
        if !(line.contains("time=") && line.contains("bitrate=")) {
            return None;
        }

        Some(Self {
            frames: extract_value(line, "frame=").and_then(|v| v.parse().ok()),
            fps: extract_value(line, "fps=").and_then(|v| v.parse().ok()),
            timemark: extract_value(line, "time="),
            bitrate: extract_value(line, "bitrate=").filter(|v| v != "N/A"),
            speed: extract_value(line, "speed=").filter(|v| v != "N/A"),
        })
    }
}

/// Value following `key`, skipping padding and stopping at the next space.
fn extract_value(line: &str, key: &str) -> Option<String> {
    let start = line.find(key)?;
    let after_key = line[start + key.len()..].trim_start();
    let end = after_key
        .find(char::is_whitespace)
        .unwrap_or(after_key.len());
    if end == 0 {
        return None;
    }
    Some(after_key[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_value() {
        let line = "frame= 123 fps= 60.0 size= 1024kB time=00:00:10.00 bitrate= 2000.0kbits/s speed= 1.0x";

        assert_eq!(extract_value(line, "frame="), Some("123".to_string()));
        assert_eq!(extract_value(line, "fps="), Some("60.0".to_string()));
        assert_eq!(extract_value(line, "time="), Some("00:00:10.00".to_string()));
        assert_eq!(extract_value(line, "bitrate="), Some("2000.0kbits/s".to_string()));
        assert_eq!(extract_value(line, "speed="), Some("1.0x".to_string()));
        assert_eq!(extract_value(line, "missing="), None);
    }

    #[test]
    fn parses_video_progress() {
        let p = Progress::parse(
            "frame=  450 fps= 30 q=-1.0 size=N/A time=00:00:15.00 bitrate=N/A speed=   1x",
        )
        .unwrap();
        assert_eq!(p.frames, Some(450));
        assert_eq!(p.fps, Some(30.0));
        assert_eq!(p.timemark.as_deref(), Some("00:00:15.00"));
        assert_eq!(p.bitrate, None);
        assert_eq!(p.speed.as_deref(), Some("1x"));
    }

    #[test]
    fn ignores_other_lines() {
        assert!(Progress::parse("Input #0, rtsp, from 'rtsp://cam/live':").is_none());
        assert!(Progress::parse("  Stream #0:0: Video: h264").is_none());
    }
}
