//! hlsrelay - live network camera to HLS relay
//!
//! This library crate exposes the supervisor, configuration loading and the
//! HTTP surface for integration testing.

pub mod config;
pub mod server;
pub mod supervisor;
