//! Error types shared by every controller operation.

use thiserror::Error;

const EPERM: i32 = 1;
const ENXIO: i32 = 6;
const ENOMEM: i32 = 12;
const EFAULT: i32 = 14;
const EBUSY: i32 = 16;
const EINVAL: i32 = 22;

/// Errors returned by gates, buffers, sessions and drivers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("Device is held by another session")]
    Busy,

    #[error("Out of memory (requested: {requested} bytes)")]
    OutOfMemory { requested: usize },

    #[error("Buffer is not allocated")]
    NotAllocated,

    #[error("Copy fault: transfer needs {needed} bytes, caller region provides {available}")]
    CopyFault { needed: usize, available: usize },

    #[error("Buffer has already been freed")]
    DoubleFree,

    #[error("Gate released without being held")]
    GateNotHeld,

    #[error("Operation '{op}' is not supported by this device")]
    Unsupported { op: &'static str },

    #[error("Invalid device configuration: {0}")]
    InvalidConfig(String),
}

impl DeviceError {
    /// Negative errno a driver entry point would hand back for this error
    pub fn errno(&self) -> i32 {
        let code = match self {
            DeviceError::Busy => EBUSY,
            DeviceError::OutOfMemory { .. } => ENOMEM,
            DeviceError::NotAllocated => ENXIO,
            DeviceError::CopyFault { .. } => EFAULT,
            DeviceError::GateNotHeld => EPERM,
            DeviceError::DoubleFree
            | DeviceError::Unsupported { .. }
            | DeviceError::InvalidConfig(_) => EINVAL,
        };
        -code
    }
}

pub type Result<T> = core::result::Result<T, DeviceError>;
