//! Fixed quality profile table.
//!
//! A [`QualityTier`] names one of three encoding buckets. [`resolve`] maps a
//! caller-supplied tier name to its immutable [`QualityProfile`]; anything
//! outside the fixed set is rejected with [`Error::UnknownQualityTier`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Named encoding bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

impl QualityTier {
    /// All tiers, lowest first.
    pub const ALL: [QualityTier; 3] = [QualityTier::Low, QualityTier::Medium, QualityTier::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }

    /// The encoding parameters for this tier.
    pub fn profile(self) -> QualityProfile {
        match self {
            QualityTier::Low => QualityProfile {
                tier: self,
                video_bitrate_kbps: 500,
                audio_bitrate_kbps: 64,
                width: 640,
                height: 360,
                frame_rate: 24,
            },
            QualityTier::Medium => QualityProfile {
                tier: self,
                video_bitrate_kbps: 1000,
                audio_bitrate_kbps: 96,
                width: 1280,
                height: 720,
                frame_rate: 30,
            },
            QualityTier::High => QualityProfile {
                tier: self,
                video_bitrate_kbps: 2000,
                audio_bitrate_kbps: 128,
                width: 1920,
                height: 1080,
                frame_rate: 30,
            },
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(QualityTier::Low),
            "medium" => Ok(QualityTier::Medium),
            "high" => Ok(QualityTier::High),
            other => Err(Error::UnknownQualityTier(other.to_string())),
        }
    }
}

/// Immutable encoding parameters for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityProfile {
    pub tier: QualityTier,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl QualityProfile {
    /// Video bitrate in engine notation, e.g. `1000k`.
    pub fn video_bitrate(&self) -> String {
        format!("{}k", self.video_bitrate_kbps)
    }

    /// Audio bitrate in engine notation, e.g. `96k`.
    pub fn audio_bitrate(&self) -> String {
        format!("{}k", self.audio_bitrate_kbps)
    }
}

/// Look up the profile for a tier name.
///
/// Names are matched exactly; `"Medium"` or `" low"` are unknown tiers.
pub fn resolve(tier_name: &str) -> Result<QualityProfile> {
    tier_name.parse::<QualityTier>().map(QualityTier::profile)
}
