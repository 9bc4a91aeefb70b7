//! hlsrelay-core: shared types for the live relay.
//!
//! Provides the unified error type, the fixed quality profile table, failure
//! classification for engine diagnostics, and the configuration sections
//! consumed by the supervisor, probe and output sink.

pub mod config;
pub mod error;
pub mod failure;
pub mod ids;
pub mod quality;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use failure::{FailureKind, FailureReason};
pub use ids::SessionId;
pub use quality::{QualityProfile, QualityTier};
