//! Config file loading
//!
//! ```toml
//! [device]
//! variant = "ioctl"
//! name = "vulnioctl"
//! capacity = 1024
//! free_policy = "strict"
//! ```

use anyhow::{Context, Result};
use chardev::{DeviceConfig, Variant};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ConfigFile {
    device: DeviceConfig,
}

/// Parse a config file body
pub fn parse(text: &str) -> Result<DeviceConfig> {
    let file: ConfigFile = toml::from_str(text).context("Invalid device config")?;
    file.device.validate()?;
    Ok(file.device)
}

/// Load the device config from `path`, or the defaults of `fallback`
pub fn load(path: Option<&Path>, fallback: Variant) -> Result<DeviceConfig> {
    let Some(path) = path else {
        return Ok(DeviceConfig::new(fallback));
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = parse(&text).with_context(|| format!("In {}", path.display()))?;
    log::debug!("loaded config for '{}' from {}", config.name(), path.display());
    Ok(config)
}
