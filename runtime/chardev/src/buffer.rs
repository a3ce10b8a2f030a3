//! Buffer Resource - Owner-tagged device buffer
//!
//! The device buffer is an optionally present byte region of fixed capacity.
//! Presence, owner and bytes live in one enum behind one mutex, so no caller
//! can observe "allocated" while another caller is halfway through a free.
//!
//! # Lifetime
//! - Echo devices allocate on open with `Owner::Session` and release on
//!   close through `release_owned`.
//! - Ioctl devices allocate and free on explicit commands with
//!   `Owner::Controller`; the region outlives sessions.
//!
//! # Freeing an absent buffer
//! `FreePolicy::Lenient` turns it into a no-op. `FreePolicy::Strict` reports
//! `NotAllocated` for a buffer that never existed and `DoubleFree` for one
//! that has already been released.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::{DeviceError, Result, SessionId};

/// Who is responsible for releasing the current region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Released when this session closes
    Session(SessionId),

    /// Released only by an explicit free or controller shutdown
    Controller,
}

/// How `free` treats a buffer that is not currently allocated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreePolicy {
    /// Freeing an absent buffer is a no-op
    #[default]
    Lenient,

    /// Freeing an absent buffer is an error
    Strict,
}

/// Result of a successful `free`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeOutcome {
    /// A region was present and has been released
    Released,

    /// Nothing was allocated (lenient policy only)
    AlreadyAbsent,
}

/// Observable allocation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Never allocated
    Empty,

    /// Present and owned by `Owner`
    Allocated(Owner),

    /// Allocated at least once, currently released
    Freed,
}

enum Slot {
    Empty,
    Allocated { owner: Owner, region: Box<[u8]> },
    Freed,
}

/// Device buffer with a fixed capacity and explicit ownership
pub struct BufferResource {
    capacity: usize,
    slot: Mutex<Slot>,
}

impl BufferResource {
    /// Create an unallocated buffer resource
    ///
    /// # Arguments
    /// * `capacity` - Size in bytes of every region this resource hands out
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slot: Mutex::new(Slot::Empty),
        }
    }

    /// Capacity in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current allocation state
    pub fn state(&self) -> BufferState {
        match &*self.lock() {
            Slot::Empty => BufferState::Empty,
            Slot::Allocated { owner, .. } => BufferState::Allocated(*owner),
            Slot::Freed => BufferState::Freed,
        }
    }

    /// Whether a region is currently present
    pub fn is_allocated(&self) -> bool {
        matches!(self.state(), BufferState::Allocated(_))
    }

    /// Owner of the current region, if any
    pub fn owner(&self) -> Option<Owner> {
        match self.state() {
            BufferState::Allocated(owner) => Some(owner),
            _ => None,
        }
    }

    /// Allocate a zeroed region of `capacity` bytes
    ///
    /// An existing region is replaced by the fresh one.
    ///
    /// # Errors
    /// `DeviceError::OutOfMemory` if the allocator cannot provide the full
    /// capacity. The previous state is kept.
    pub fn allocate(&self, owner: Owner) -> Result<()> {
        let region = zeroed_region(self.capacity)?;
        let mut slot = self.lock();
        if let Slot::Allocated { owner: previous, .. } = &*slot {
            log::debug!("replacing buffer owned by {:?} with one owned by {:?}", previous, owner);
        }
        *slot = Slot::Allocated { owner, region };
        Ok(())
    }

    /// Allocate a zeroed region and copy `init` into its start
    ///
    /// `init` is truncated to the capacity; the rest stays zero.
    ///
    /// # Returns
    /// Number of bytes of `init` that were copied
    pub fn allocate_with(&self, owner: Owner, init: &[u8]) -> Result<usize> {
        let mut region = zeroed_region(self.capacity)?;
        let len = init.len().min(self.capacity);
        region[..len].copy_from_slice(&init[..len]);
        *self.lock() = Slot::Allocated { owner, region };
        Ok(len)
    }

    /// Release the current region regardless of owner
    ///
    /// # Errors
    /// Under `FreePolicy::Strict`: `NotAllocated` if nothing was ever
    /// allocated, `DoubleFree` if the region was already released.
    pub fn free(&self, policy: FreePolicy) -> Result<FreeOutcome> {
        let mut slot = self.lock();
        match (&*slot, policy) {
            (Slot::Allocated { .. }, _) => {
                *slot = Slot::Freed;
                Ok(FreeOutcome::Released)
            }
            (_, FreePolicy::Lenient) => Ok(FreeOutcome::AlreadyAbsent),
            (Slot::Empty, FreePolicy::Strict) => Err(DeviceError::NotAllocated),
            (Slot::Freed, FreePolicy::Strict) => Err(DeviceError::DoubleFree),
        }
    }

    /// Release the current region only if `owner` owns it
    ///
    /// The owner check and the release happen under the same lock.
    ///
    /// # Returns
    /// `true` if a region was released
    pub fn release_owned(&self, owner: Owner) -> bool {
        let mut slot = self.lock();
        match &*slot {
            Slot::Allocated { owner: current, .. } if *current == owner => {
                *slot = Slot::Freed;
                true
            }
            _ => false,
        }
    }

    /// Run `f` on the allocated bytes
    ///
    /// # Errors
    /// `DeviceError::NotAllocated` if no region is present, otherwise whatever
    /// `f` returns.
    pub fn with_region<R>(&self, f: impl FnOnce(&[u8]) -> Result<R>) -> Result<R> {
        match &*self.lock() {
            Slot::Allocated { region, .. } => f(region),
            _ => Err(DeviceError::NotAllocated),
        }
    }

    /// Run `f` on the allocated bytes, mutably
    pub fn with_region_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> Result<R>) -> Result<R> {
        match &mut *self.lock() {
            Slot::Allocated { region, .. } => f(region),
            _ => Err(DeviceError::NotAllocated),
        }
    }

    /// Drop whatever is allocated, used on controller teardown
    ///
    /// # Returns
    /// The owner of the region that was dropped, if there was one
    pub(crate) fn teardown(&self) -> Option<Owner> {
        let mut slot = self.lock();
        match core::mem::replace(&mut *slot, Slot::Freed) {
            Slot::Allocated { owner, .. } => Some(owner),
            previous => {
                *slot = previous;
                None
            }
        }
    }

    // Every mutation completes before the guard drops, so a poisoned lock
    // still holds a consistent slot.
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl core::fmt::Debug for BufferResource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BufferResource")
            .field("capacity", &self.capacity)
            .field("state", &self.state())
            .finish()
    }
}

fn zeroed_region(capacity: usize) -> Result<Box<[u8]>> {
    let mut region = Vec::new();
    region
        .try_reserve_exact(capacity)
        .map_err(|_| DeviceError::OutOfMemory { requested: capacity })?;
    region.resize(capacity, 0);
    Ok(region.into_boxed_slice())
}
