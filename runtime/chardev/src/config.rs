//! Device configuration
//!
//! Deserialisable description of one device. Missing fields fall back to the
//! defaults of the selected variant.

use serde::{Deserialize, Serialize};

use crate::buffer::FreePolicy;
use crate::echo::{EchoDriver, ECHO_BUF_SZ, ECHO_DEFAULT_CONTENT, ECHO_DEV_NAME};
use crate::ioctl::{IoctlDriver, IOCTL_BUF_SZ, IOCTL_DEV_NAME};
use crate::{DeviceError, Result};

/// Largest buffer capacity a configuration may ask for (16 MiB)
pub const MAX_CAPACITY: usize = 1 << 24;

/// Device variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Session-scoped buffer with default content
    Echo,

    /// Command-managed buffer shared across sessions
    Ioctl,
}

impl Variant {
    pub fn default_name(self) -> &'static str {
        match self {
            Variant::Echo => ECHO_DEV_NAME,
            Variant::Ioctl => IOCTL_DEV_NAME,
        }
    }

    pub fn default_capacity(self) -> usize {
        match self {
            Variant::Echo => ECHO_BUF_SZ,
            Variant::Ioctl => IOCTL_BUF_SZ,
        }
    }
}

/// Configuration of one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub variant: Variant,

    /// Device node name (variant default if absent)
    #[serde(default)]
    pub name: Option<String>,

    /// Buffer capacity in bytes (variant default if absent)
    #[serde(default)]
    pub capacity: Option<usize>,

    /// Treatment of a free on an absent buffer (ioctl only)
    #[serde(default)]
    pub free_policy: FreePolicy,

    /// Content written on every open (echo only)
    #[serde(default)]
    pub default_content: Option<String>,
}

impl DeviceConfig {
    /// Defaults of the given variant
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            name: None,
            capacity: None,
            free_policy: FreePolicy::default(),
            default_content: None,
        }
    }

    pub fn echo() -> Self {
        Self::new(Variant::Echo)
    }

    pub fn ioctl() -> Self {
        Self::new(Variant::Ioctl)
    }

    /// Effective device node name
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.variant.default_name())
    }

    /// Effective buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity.unwrap_or(self.variant.default_capacity())
    }

    /// Effective default content (empty for ioctl devices)
    pub fn content(&self) -> &[u8] {
        match (&self.default_content, self.variant) {
            (Some(content), _) => content.as_bytes(),
            (None, Variant::Echo) => ECHO_DEFAULT_CONTENT,
            (None, Variant::Ioctl) => &[],
        }
    }

    /// Check the configuration for values no device can work with
    pub fn validate(&self) -> Result<()> {
        if self.capacity() == 0 {
            return Err(DeviceError::InvalidConfig("capacity must be non-zero".into()));
        }
        if self.capacity() > MAX_CAPACITY {
            return Err(DeviceError::InvalidConfig(format!(
                "capacity {:#x} exceeds the limit of {:#x} bytes",
                self.capacity(),
                MAX_CAPACITY
            )));
        }
        if self.name().is_empty() {
            return Err(DeviceError::InvalidConfig("device name must not be empty".into()));
        }
        Ok(())
    }

    /// Build the echo driver described by this configuration
    ///
    /// # Errors
    /// `InvalidConfig` if the configuration is invalid or not an echo device
    pub fn echo_driver(&self) -> Result<EchoDriver> {
        self.validate()?;
        if self.variant != Variant::Echo {
            return Err(DeviceError::InvalidConfig(format!(
                "device '{}' is not an echo device",
                self.name()
            )));
        }
        Ok(EchoDriver::with_content(self.name(), self.capacity(), self.content()))
    }

    /// Build the ioctl driver described by this configuration
    pub fn ioctl_driver(&self) -> Result<IoctlDriver> {
        self.validate()?;
        if self.variant != Variant::Ioctl {
            return Err(DeviceError::InvalidConfig(format!(
                "device '{}' is not an ioctl device",
                self.name()
            )));
        }
        Ok(IoctlDriver::with_policy(self.name(), self.capacity(), self.free_policy))
    }
}
