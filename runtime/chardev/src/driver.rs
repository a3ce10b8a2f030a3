//! Driver trait - per-variant entry points
//!
//! A `CharDriver` is the table of entry points a device variant provides,
//! in the spirit of a file operations table. Entry points a variant does
//! not provide fall back to `DeviceError::Unsupported`, the way a missing
//! table entry fails the system call.
//!
//! Admission control is not part of the driver: `Controller` takes the gate
//! before `open` and gives it back after `release`.

use crate::buffer::BufferResource;
use crate::dispatch::ControlReply;
use crate::{DeviceError, Result, SessionId, UserBuffer};

/// Entry points of one device variant
pub trait CharDriver: Send + Sync {
    /// Device node name
    fn name(&self) -> &str;

    /// Buffer capacity in bytes
    fn capacity(&self) -> usize;

    /// Called after the gate admitted `session`
    ///
    /// An error fails the open; the controller then releases the gate again.
    fn open(&self, buffer: &BufferResource, session: SessionId) -> Result<()>;

    /// Called when `session` closes, before the gate is released
    fn release(&self, buffer: &BufferResource, session: SessionId);

    /// Copy up to `count` bytes at `*pos` into `user`, advancing `*pos`
    fn read(
        &self,
        _buffer: &BufferResource,
        _pos: &mut usize,
        _user: &mut UserBuffer<'_>,
        _count: usize,
    ) -> Result<usize> {
        Err(DeviceError::Unsupported { op: "read" })
    }

    /// Copy up to `count` bytes from `user` into the buffer
    fn write(&self, _buffer: &BufferResource, _user: &UserBuffer<'_>, _count: usize) -> Result<usize> {
        Err(DeviceError::Unsupported { op: "write" })
    }

    /// Execute a control code
    fn control(
        &self,
        _buffer: &BufferResource,
        _code: u32,
        _arg: &mut UserBuffer<'_>,
    ) -> Result<ControlReply> {
        Err(DeviceError::Unsupported { op: "control" })
    }
}
