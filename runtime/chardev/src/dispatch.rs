//! Command Dispatcher - read/write primitives and control codes
//!
//! Read and write are bounded copies between the device buffer and a
//! `UserBuffer`. Control codes form a closed set; anything outside the set
//! is ignored rather than rejected.
//!
//! | Code      | Command         | Effect                                  |
//! |-----------|-----------------|-----------------------------------------|
//! | `0xdead0` | GetFixedValue   | reply with `FIXED_VALUE`                |
//! | `0xdead1` | Allocate        | allocate a zeroed buffer                |
//! | `0xdead2` | Free            | free the buffer under the `FreePolicy`  |
//! | `0xdead3` | ReadAll         | copy the whole buffer to the caller     |
//! | `0xdead4` | WriteAll        | copy a whole buffer from the caller     |

use crate::buffer::{BufferResource, FreeOutcome, FreePolicy, Owner};
use crate::{Result, UserBuffer};

/// Value reported by `Command::GetFixedValue`
pub const FIXED_VALUE: u32 = 0x1234_5678;

/// Recognised control commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
    GetFixedValue = 0xdead0,
    Allocate = 0xdead1,
    Free = 0xdead2,
    ReadAll = 0xdead3,
    WriteAll = 0xdead4,
}

impl Command {
    /// All recognised commands, in code order
    pub const ALL: [Command; 5] = [
        Command::GetFixedValue,
        Command::Allocate,
        Command::Free,
        Command::ReadAll,
        Command::WriteAll,
    ];

    /// Map a raw code to a command, `None` for unrecognised codes
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.code() == code)
    }

    /// Raw code of this command
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Successful outcome of a control call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlReply {
    /// A status value for the caller
    Value(u32),

    /// The command ran
    Done,

    /// Free found nothing to release (lenient policy)
    AlreadyFreed,

    /// The code is not recognised; nothing happened
    Ignored,
}

/// Copy up to `count` bytes starting at `*pos` into `user`
///
/// Copies `min(count, capacity - pos)` bytes (0 once `pos` reaches the
/// capacity) and advances `*pos` by the amount copied.
///
/// # Errors
/// - `NotAllocated` if the buffer is absent
/// - `CopyFault` if `user` cannot take the full amount; `*pos` is unchanged
pub fn read(
    buffer: &BufferResource,
    pos: &mut usize,
    user: &mut UserBuffer<'_>,
    count: usize,
) -> Result<usize> {
    let start = *pos;
    let len = buffer.with_region(|region| {
        let start = start.min(region.len());
        let len = count.min(region.len() - start);
        user.copy_to_user(&region[start..start + len])?;
        Ok(len)
    })?;
    *pos = start.saturating_add(len);
    log::debug!("read {} bytes at offset {} (requested {})", len, start, count);
    Ok(len)
}

/// Copy `min(count, capacity)` bytes from `user` to the start of the buffer
///
/// # Errors
/// - `NotAllocated` if the buffer is absent
/// - `CopyFault` if `user` is shorter than the amount to copy; the buffer is
///   left untouched
pub fn write(buffer: &BufferResource, user: &UserBuffer<'_>, count: usize) -> Result<usize> {
    let len = buffer.with_region_mut(|region| {
        let len = count.min(region.len());
        user.copy_from_user(&mut region[..len])?;
        Ok(len)
    })?;
    log::debug!("wrote {} bytes (requested {})", len, count);
    Ok(len)
}

/// Execute one control code against `buffer`
///
/// Allocations made here belong to the controller, not to a session.
pub fn control(
    buffer: &BufferResource,
    policy: FreePolicy,
    code: u32,
    arg: &mut UserBuffer<'_>,
) -> Result<ControlReply> {
    let Some(command) = Command::from_code(code) else {
        log::debug!("ignoring unrecognised control code {:#x}", code);
        return Ok(ControlReply::Ignored);
    };
    log::debug!("control {:?} ({:#x})", command, code);

    match command {
        Command::GetFixedValue => Ok(ControlReply::Value(FIXED_VALUE)),
        Command::Allocate => {
            buffer.allocate(Owner::Controller)?;
            Ok(ControlReply::Done)
        }
        Command::Free => match buffer.free(policy) {
            Ok(FreeOutcome::Released) => Ok(ControlReply::Done),
            Ok(FreeOutcome::AlreadyAbsent) => Ok(ControlReply::AlreadyFreed),
            Err(err) => {
                log::warn!("rejected free: {}", err);
                Err(err)
            }
        },
        Command::ReadAll => {
            buffer.with_region(|region| arg.copy_to_user(region))?;
            Ok(ControlReply::Done)
        }
        Command::WriteAll => {
            buffer.with_region_mut(|region| arg.copy_from_user(region))?;
            Ok(ControlReply::Done)
        }
    }
}
