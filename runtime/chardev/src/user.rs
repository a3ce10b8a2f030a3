//! User Buffers - Bounded transfers to and from the caller
//!
//! Every copy between the device buffer and the caller goes through a
//! `UserBuffer`. A transfer either moves the full requested length or fails
//! with `DeviceError::CopyFault` before touching either side; there are no
//! short copies and no unchecked pointer/length pairs.

use crate::{DeviceError, Result};

/// Caller-side memory region handed to a device operation
#[derive(Debug)]
pub enum UserBuffer<'a> {
    /// No region (a null argument)
    Null,

    /// Region the device may only copy from
    Readable(&'a [u8]),

    /// Region the device may copy to and from
    Writable(&'a mut [u8]),
}

impl<'a> UserBuffer<'a> {
    pub fn null() -> Self {
        UserBuffer::Null
    }

    /// Read-only caller region (source of a write)
    pub fn from_slice(data: &'a [u8]) -> Self {
        UserBuffer::Readable(data)
    }

    /// Writable caller region (destination of a read)
    pub fn from_mut(data: &'a mut [u8]) -> Self {
        UserBuffer::Writable(data)
    }

    /// Length of the caller region in bytes
    pub fn len(&self) -> usize {
        match self {
            UserBuffer::Null => 0,
            UserBuffer::Readable(data) => data.len(),
            UserBuffer::Writable(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self) -> bool {
        matches!(self, UserBuffer::Null)
    }

    /// Copy all of `src` into the start of the caller region
    ///
    /// An empty `src` always succeeds.
    ///
    /// # Errors
    /// `DeviceError::CopyFault` if the region is null, read-only or shorter
    /// than `src`. Nothing is written in that case.
    pub fn copy_to_user(&mut self, src: &[u8]) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }
        match self {
            UserBuffer::Writable(dst) if dst.len() >= src.len() => {
                dst[..src.len()].copy_from_slice(src);
                Ok(())
            }
            UserBuffer::Writable(dst) => Err(fault(src.len(), dst.len())),
            _ => Err(fault(src.len(), 0)),
        }
    }

    /// Fill all of `dst` from the start of the caller region
    ///
    /// # Errors
    /// `DeviceError::CopyFault` if the region is null or shorter than `dst`.
    /// `dst` is left untouched in that case.
    pub fn copy_from_user(&self, dst: &mut [u8]) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        let src: &[u8] = match self {
            UserBuffer::Null => return Err(fault(dst.len(), 0)),
            UserBuffer::Readable(data) => data,
            UserBuffer::Writable(data) => data,
        };
        if src.len() < dst.len() {
            return Err(fault(dst.len(), src.len()));
        }
        dst.copy_from_slice(&src[..dst.len()]);
        Ok(())
    }
}

fn fault(needed: usize, available: usize) -> DeviceError {
    log::warn!("user copy fault: needed {} bytes, region has {}", needed, available);
    DeviceError::CopyFault { needed, available }
}
