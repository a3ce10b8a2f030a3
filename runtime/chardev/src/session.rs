//! Sessions - one client's open handle on a controller
//!
//! A `Session` only exists between a successful `Controller::open_session`
//! and `close`. Closing consumes the handle and dropping an unclosed handle
//! closes it too, so a session cannot be closed twice or closed without
//! having been opened.

use core::fmt;

use crate::dispatch::ControlReply;
use crate::driver::CharDriver;
use crate::{Controller, Result, UserBuffer};

/// Identifier of one session, unique per controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Open handle on a controller
///
/// Holds the controller's gate for as long as it lives. The read cursor
/// starts at 0 on every open.
pub struct Session<'c, D: CharDriver> {
    controller: &'c Controller<D>,
    id: SessionId,
    pos: usize,
    closed: bool,
}

impl<'c, D: CharDriver> Session<'c, D> {
    pub(crate) fn new(controller: &'c Controller<D>, id: SessionId) -> Self {
        Self {
            controller,
            id,
            pos: 0,
            closed: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Controller this session is bound to
    pub fn controller(&self) -> &'c Controller<D> {
        self.controller
    }

    /// Current read cursor
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the read cursor
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Read up to `count` bytes at the cursor into `user`
    ///
    /// # Returns
    /// Number of bytes copied; the cursor advances by the same amount
    pub fn read(&mut self, user: &mut UserBuffer<'_>, count: usize) -> Result<usize> {
        let controller = self.controller;
        controller
            .driver()
            .read(controller.buffer(), &mut self.pos, user, count)
    }

    /// Read up to `count` bytes at `offset` into `user`
    pub fn read_at(&mut self, offset: usize, user: &mut UserBuffer<'_>, count: usize) -> Result<usize> {
        self.seek(offset);
        self.read(user, count)
    }

    /// Read up to `len` bytes at `offset` into a new vector
    pub fn pread(&mut self, offset: usize, len: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; len];
        let copied = self.read_at(offset, &mut UserBuffer::from_mut(&mut out), len)?;
        out.truncate(copied);
        Ok(out)
    }

    /// Write up to `count` bytes from `user` to the start of the buffer
    ///
    /// Writes do not move the read cursor.
    pub fn write(&mut self, user: &UserBuffer<'_>, count: usize) -> Result<usize> {
        let controller = self.controller;
        controller.driver().write(controller.buffer(), user, count)
    }

    /// Write all of `bytes` (clamped to capacity)
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
        self.write(&UserBuffer::from_slice(bytes), bytes.len())
    }

    /// Execute a control code with `arg` as the caller region
    pub fn control(&mut self, code: u32, arg: &mut UserBuffer<'_>) -> Result<ControlReply> {
        let controller = self.controller;
        controller.driver().control(controller.buffer(), code, arg)
    }

    /// Close the session and release the gate
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.controller.release_session(self.id)
    }
}

impl<D: CharDriver> Drop for Session<'_, D> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.controller.release_session(self.id) {
            log::error!("failed to release {} on drop: {}", self.id, err);
        }
    }
}

impl<D: CharDriver> fmt::Debug for Session<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("device", &self.controller.name())
            .field("id", &self.id)
            .field("pos", &self.pos)
            .finish()
    }
}
