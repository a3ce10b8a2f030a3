//! Echo device
//!
//! Every open allocates a fresh session-owned buffer holding the default
//! content; every close frees it. Reads and writes go straight to that
//! buffer, so data written in one session is gone in the next.

use static_assertions::const_assert;

use crate::buffer::{BufferResource, Owner};
use crate::driver::CharDriver;
use crate::{dispatch, Result, SessionId, UserBuffer};

/// Device node name of the echo device
pub const ECHO_DEV_NAME: &str = "likedbg";

/// Buffer capacity of the echo device
pub const ECHO_BUF_SZ: usize = 0x100;

/// Content placed in the buffer on every open
pub const ECHO_DEFAULT_CONTENT: &[u8] = b"Welcome to the LIKE-DBG echo service demo...\n";

const_assert!(ECHO_DEFAULT_CONTENT.len() <= ECHO_BUF_SZ);

/// Session-scoped echo buffer device
#[derive(Debug, Clone)]
pub struct EchoDriver {
    name: String,
    capacity: usize,
    content: Vec<u8>,
}

impl EchoDriver {
    /// Echo device with the default name, capacity and content
    pub fn new() -> Self {
        Self::with_content(ECHO_DEV_NAME, ECHO_BUF_SZ, ECHO_DEFAULT_CONTENT)
    }

    /// Echo device with custom parameters
    ///
    /// `content` is truncated to `capacity` when written on open.
    pub fn with_content(name: impl Into<String>, capacity: usize, content: &[u8]) -> Self {
        Self {
            name: name.into(),
            capacity,
            content: content.to_vec(),
        }
    }

    /// Content written into the buffer on open
    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

impl Default for EchoDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CharDriver for EchoDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn open(&self, buffer: &BufferResource, session: SessionId) -> Result<()> {
        match buffer.allocate_with(Owner::Session(session), &self.content) {
            Ok(copied) => {
                log::debug!("{}: buffer initialised with {} bytes of default content", self.name, copied);
                Ok(())
            }
            Err(err) => {
                log::warn!("{}: buffer allocation failed: {}", self.name, err);
                Err(err)
            }
        }
    }

    fn release(&self, buffer: &BufferResource, session: SessionId) {
        if !buffer.release_owned(Owner::Session(session)) {
            log::debug!("{}: no buffer owned by {} at release", self.name, session);
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
}
