//! Ioctl device
//!
//! The buffer is managed only through control codes (see `dispatch`). Open
//! and close do not touch it: a buffer allocated in one session is still
//! there in the next, and a buffer freed by one session is gone for all of
//! them. Read and write operate on whatever the commands left behind.

use crate::buffer::{BufferResource, FreePolicy};
use crate::dispatch::{self, ControlReply};
use crate::driver::CharDriver;
use crate::{Result, SessionId, UserBuffer};

/// Device node name of the ioctl device
pub const IOCTL_DEV_NAME: &str = "vulnioctl";

/// Buffer capacity of the ioctl device
pub const IOCTL_BUF_SZ: usize = 0x400;

/// Command-driven buffer device
#[derive(Debug, Clone)]
pub struct IoctlDriver {
    name: String,
    capacity: usize,
    policy: FreePolicy,
}

impl IoctlDriver {
    /// Ioctl device with the default name and capacity and a lenient free
    pub fn new() -> Self {
        Self::with_policy(IOCTL_DEV_NAME, IOCTL_BUF_SZ, FreePolicy::Lenient)
    }

    /// Ioctl device with an explicit name, capacity and free policy
    pub fn with_policy(name: impl Into<String>, capacity: usize, policy: FreePolicy) -> Self {
        Self {
            name: name.into(),
            capacity,
            policy,
        }
    }

    /// Policy applied to FREE on an absent buffer
    pub fn policy(&self) -> FreePolicy {
        self.policy
    }
}

impl Default for IoctlDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CharDriver for IoctlDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn open(&self, _buffer: &BufferResource, session: SessionId) -> Result<()> {
        log::debug!("{}: bound {}", self.name, session);
        Ok(())
    }

    fn release(&self, buffer: &BufferResource, session: SessionId) {
        if buffer.is_allocated() {
            log::debug!("{}: buffer stays allocated after {} closes", self.name, session);
        }
    }

    fn read(
        &self,
        buffer: &BufferResource,
        pos: &mut usize,
        user: &mut UserBuffer<'_>,
        count: usize,
    ) -> Result<usize> {
        dispatch::read(buffer, pos, user, count)
    }

    fn write(&self, buffer: &BufferResource, user: &UserBuffer<'_>, count: usize) -> Result<usize> {
        dispatch::write(buffer, user, count)
    }

    fn control(
        &self,
        buffer: &BufferResource,
        code: u32,
        arg: &mut UserBuffer<'_>,
    ) -> Result<ControlReply> {
        dispatch::control(buffer, self.policy, code, arg)
    }
}
