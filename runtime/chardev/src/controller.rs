//! Controller - the device context
//!
//! One `Controller` stands for one loaded device: it is built once at load
//! time with `Controller::new`, handed by reference to every caller, and
//! torn down with `Controller::shutdown`. It owns the gate, the buffer and
//! the driver variant; sessions borrow it.
//!
//! # Session flow
//! ```text
//!   open_session ──gate.try_acquire──> driver.open ──> Session
//!        │ Busy                           │ error: gate released again
//!        ▼                                ▼
//!      Err(Busy)                     Err(OutOfMemory)
//!
//!   Session::close ──> driver.release ──> gate.release
//! ```

use core::sync::atomic::{AtomicU64, Ordering};

use crate::buffer::{BufferResource, Owner};
use crate::driver::CharDriver;
use crate::gate::Gate;
use crate::{Result, Session, SessionId};

/// A loaded device: gate, buffer and driver
pub struct Controller<D: CharDriver> {
    driver: D,
    gate: Gate,
    buffer: BufferResource,
    next_session: AtomicU64,
}

impl<D: CharDriver> Controller<D> {
    /// Load a device
    ///
    /// The buffer starts unallocated with the driver's capacity.
    pub fn new(driver: D) -> Self {
        let buffer = BufferResource::new(driver.capacity());
        log::info!("device '{}' loaded ({} byte buffer)", driver.name(), buffer.capacity());
        Self {
            driver,
            gate: Gate::new(),
            buffer,
            next_session: AtomicU64::new(1),
        }
    }

    pub fn name(&self) -> &str {
        self.driver.name()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    pub fn buffer(&self) -> &BufferResource {
        &self.buffer
    }

    /// Whether a session currently holds the device
    pub fn is_open(&self) -> bool {
        self.gate.is_held()
    }

    /// Open a session
    ///
    /// # Errors
    /// - `Busy` if another session is open; nothing changes
    /// - whatever the driver's `open` returns (`OutOfMemory` for echo
    ///   devices); the gate is released again before returning
    pub fn open_session(&self) -> Result<Session<'_, D>> {
        if let Err(err) = self.gate.try_acquire() {
            log::warn!("device '{}' is already open, refusing new session", self.name());
            return Err(err);
        }

        let id = SessionId::new(self.next_session.fetch_add(1, Ordering::Relaxed));
        if let Err(err) = self.driver.open(&self.buffer, id) {
            self.release_gate();
            return Err(err);
        }

        log::info!("device '{}' opened by {}", self.name(), id);
        Ok(Session::new(self, id))
    }

    pub(crate) fn release_session(&self, id: SessionId) -> Result<()> {
        self.driver.release(&self.buffer, id);
        self.gate.release()?;
        log::info!("device '{}' closed by {}", self.name(), id);
        Ok(())
    }

    /// Unload the device, dropping any buffer still allocated
    ///
    /// # Returns
    /// Owner of the buffer that was still allocated, if any
    pub fn shutdown(self) -> Option<Owner> {
        let leftover = self.buffer.teardown();
        if let Some(owner) = leftover {
            log::debug!("device '{}' dropped buffer owned by {:?}", self.name(), owner);
        }
        log::info!("device '{}' unloaded", self.name());
        leftover
    }

    fn release_gate(&self) {
        if let Err(err) = self.gate.release() {
            log::error!("device '{}' gate inconsistent: {}", self.name(), err);
        }
    }
}

impl<D: CharDriver> core::fmt::Debug for Controller<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.name())
            .field("gate", &self.gate)
            .field("buffer", &self.buffer)
            .finish()
    }
}
