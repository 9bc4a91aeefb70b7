//! # hlsrelay-av
//!
//! Transcoding engine plumbing for the live relay.
//!
//! This crate provides:
//!
//! - **Engine discovery** ([`EngineLocator`]) -- find the ffmpeg executable
//!   from config or `PATH` and report its version.
//! - **Command building** ([`EngineCommand`], [`args`]) -- engine invocation
//!   with profile-derived HLS arguments and timeout support.
//! - **Process supervision** ([`EngineProcess`]) -- spawn the engine, stream
//!   its lifecycle as [`EngineEvent`]s, graceful and forced termination.
//! - **Output sink** ([`OutputSink`]) -- playlist/segment directory lifecycle.
//! - **Connectivity probe** ([`ConnectivityProbe`]) -- time-bounded trial run
//!   against a source address.

pub mod args;
pub mod command;
pub mod output;
pub mod probe;
pub mod process;
pub mod progress;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{EngineCommand, ToolOutput};
pub use output::{OutputLayout, OutputSink};
pub use probe::ConnectivityProbe;
pub use process::{EngineEvent, EngineProcess, ExitReport};
pub use progress::Progress;
pub use tools::{EngineInfo, EngineLocator};
