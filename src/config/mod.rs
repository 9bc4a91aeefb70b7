//! Configuration file loading.
//!
//! The configuration types live in [`hlsrelay_core::config`]; this module
//! finds, parses and validates the TOML file.

pub use hlsrelay_core::config::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Locations searched, in order, when no path is given.
const DEFAULT_PATHS: &[&str] = &[
    "./hlsrelay.toml",
    "./config.toml",
    "~/.config/hlsrelay/config.toml",
    "/etc/hlsrelay/config.toml",
];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config = parse_config(&content)
        .with_context(|| format!("Invalid config file: {:?}", path))?;

    tracing::debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    for path_str in DEFAULT_PATHS {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    tracing::debug!("No config file found; using defaults");
    Ok(Config::default())
}

/// Parse and validate TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse TOML")?;
    config.validate()?;
    Ok(config)
}
