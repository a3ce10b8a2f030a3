//! Gate - Single-permit admission control
//!
//! The gate decides which client may hold the device. It never blocks: a
//! client that finds the permit taken gets `DeviceError::Busy` right away.
//!
//! The permit count only ever takes the values 0 and 1. Both transitions are
//! a single compare-and-swap, so a refused acquire leaves no transient
//! decrement behind and a stray release cannot push the count above 1.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::{DeviceError, Result};

const AVAILABLE: u32 = 1;
const HELD: u32 = 0;

/// Single-permit, fail-fast admission gate
#[derive(Debug)]
pub struct Gate {
    permits: AtomicU32,
}

impl Gate {
    /// Create an open gate (one permit available)
    pub const fn new() -> Self {
        Self {
            permits: AtomicU32::new(AVAILABLE),
        }
    }

    /// Take the permit if it is free
    ///
    /// # Errors
    /// `DeviceError::Busy` if another client holds the permit. The count is
    /// not touched in that case.
    pub fn try_acquire(&self) -> Result<()> {
        self.permits
            .compare_exchange(AVAILABLE, HELD, Ordering::Acquire, Ordering::Relaxed)
            .map(|_| ())
            .map_err(|_| DeviceError::Busy)
    }

    /// Give the permit back
    ///
    /// # Errors
    /// `DeviceError::GateNotHeld` if the permit was not taken. The count stays
    /// at 1.
    pub fn release(&self) -> Result<()> {
        self.permits
            .compare_exchange(HELD, AVAILABLE, Ordering::Release, Ordering::Relaxed)
            .map(|_| ())
            .map_err(|_| DeviceError::GateNotHeld)
    }

    /// Current permit count (0 or 1)
    pub fn permits(&self) -> u32 {
        self.permits.load(Ordering::Acquire)
    }

    /// Whether a client currently holds the permit
    pub fn is_held(&self) -> bool {
        self.permits() == HELD
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}
