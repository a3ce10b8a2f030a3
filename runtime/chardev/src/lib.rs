//! chardev - Single-client character device controllers
//!
//! # Purpose
//! Models a device that one client at a time opens, talks to through
//! read/write/control calls, and closes. The controller admits clients
//! through a single-permit gate and manages one internal buffer purely in
//! response to those calls.
//!
//! # Architecture
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Caller (CLI, tests, driver-model glue)      │
//! └──────────────┬───────────────────────────────┘
//!                │ open_session / read / write / control / close
//! ┌──────────────▼───────────────────────────────┐
//! │  Controller<D>                               │
//! │  • Gate            (one session at a time)   │
//! │  • BufferResource  (owner-tagged region)     │
//! │  • D: CharDriver   (EchoDriver/IoctlDriver)  │
//! └──────────────┬───────────────────────────────┘
//!                │ bounded copies
//! ┌──────────────▼───────────────────────────────┐
//! │  UserBuffer (caller region)                  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Variants
//! - **Echo**: buffer allocated with default content on open, freed on close.
//! - **Ioctl**: buffer allocated and freed only by control commands, shared
//!   across sessions. A free of an absent buffer follows the configured
//!   `FreePolicy`.
//!
//! # Usage
//! ```
//! use chardev::{Controller, EchoDriver};
//!
//! let controller = Controller::new(EchoDriver::new());
//! let mut session = controller.open_session()?;
//! session.write_bytes(b"AB")?;
//! assert_eq!(session.pread(0, 2)?, b"AB");
//! session.close()?;
//! # Ok::<(), chardev::DeviceError>(())
//! ```

pub mod buffer;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod driver;
pub mod echo;
pub mod error;
pub mod gate;
pub mod ioctl;
pub mod session;
pub mod user;

pub use buffer::{BufferResource, BufferState, FreeOutcome, FreePolicy, Owner};
pub use config::{DeviceConfig, Variant, MAX_CAPACITY};
pub use controller::Controller;
pub use dispatch::{Command, ControlReply, FIXED_VALUE};
pub use driver::CharDriver;
pub use echo::{EchoDriver, ECHO_BUF_SZ, ECHO_DEFAULT_CONTENT, ECHO_DEV_NAME};
pub use error::{DeviceError, Result};
pub use gate::Gate;
pub use ioctl::{IoctlDriver, IOCTL_BUF_SZ, IOCTL_DEV_NAME};
pub use session::{Session, SessionId};
pub use user::UserBuffer;

static_assertions::assert_impl_all!(Controller<EchoDriver>: Send, Sync);
static_assertions::assert_impl_all!(Controller<IoctlDriver>: Send, Sync);
