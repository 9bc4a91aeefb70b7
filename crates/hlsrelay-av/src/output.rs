//! Output directory management for segmented playback.
//!
//! The [`OutputSink`] owns the directory the engine writes its rolling HLS
//! playlist and numbered segments into. It is reset before every session so
//! stale segments from a previous source are never served as current.

use std::io::Read;
use std::path::{Path, PathBuf};

use hlsrelay_core::config::OutputConfig;
use serde::Serialize;

/// Header every valid HLS playlist starts with.
const PLAYLIST_TAG: &[u8] = b"#EXTM3U";

/// Paths and segmenting parameters handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub playlist: PathBuf,
    pub segment_pattern: PathBuf,
    pub segment_seconds: u32,
    pub list_size: u32,
}

/// Directory listing used by the debug endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputListing {
    pub directory: PathBuf,
    pub exists: bool,
    pub files: Vec<String>,
    pub has_playlist: bool,
    pub has_segments: bool,
}

/// The segment/playlist directory.
#[derive(Debug, Clone)]
pub struct OutputSink {
    dir: PathBuf,
    playlist_name: String,
    segment_template: String,
    segment_seconds: u32,
    list_size: u32,
}

impl OutputSink {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            playlist_name: config.playlist_name.clone(),
            segment_template: config.segment_template.clone(),
            segment_seconds: config.segment_seconds,
            list_size: config.list_size,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn playlist_name(&self) -> &str {
        &self.playlist_name
    }

    pub fn playlist_path(&self) -> PathBuf {
        self.dir.join(&self.playlist_name)
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout {
            playlist: self.playlist_path(),
            segment_pattern: self.dir.join(&self.segment_template),
            segment_seconds: self.segment_seconds,
            list_size: self.list_size,
        }
    }

    /// Ensure the directory exists and holds no playlist or segment files.
    ///
    /// Returns the number of files removed. Files of other kinds are left in
    /// place.
    pub fn reset(&self) -> hlsrelay_core::Result<usize> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)?;
            tracing::info!(dir = %self.dir.display(), "Created output directory");
            return Ok(0);
        }

        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_file() && is_stream_file(&path) {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }

        tracing::debug!(dir = %self.dir.display(), removed, "Cleaned output directory");
        Ok(removed)
    }

    /// Whether a playlist the player can load currently exists.
    ///
    /// The engine needs a few seconds after launch before it writes the first
    /// playlist; an empty or partially written file does not count.
    pub fn has_ready_output(&self) -> bool {
        let Ok(mut file) = std::fs::File::open(self.playlist_path()) else {
            return false;
        };
        let mut head = [0u8; PLAYLIST_TAG.len()];
        match file.read_exact(&mut head) {
            Ok(()) => head == PLAYLIST_TAG,
            Err(_) => false,
        }
    }

    /// List the directory contents, sorted by name.
    pub fn listing(&self) -> OutputListing {
        let mut files: Vec<String> = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        };
        files.sort();

        OutputListing {
            directory: self.dir.clone(),
            exists: self.dir.is_dir(),
            has_playlist: files.iter().any(|f| f.ends_with(".m3u8")),
            has_segments: files.iter().any(|f| f.ends_with(".ts")),
            files,
        }
    }
}

fn is_stream_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("m3u8") | Some("ts") | Some("tmp")
    )
}
