//! Integration tests for the echo and ioctl controllers
//!
//! These tests drive complete sessions through the public API:
//! - Admission control across sessions and threads
//! - Echo content reset on every open
//! - Ioctl buffer lifetime across sessions
//! - Both free policies

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;

use chardev::*;

/// Test that a second open while one session is held is refused
#[test]
fn test_open_twice_is_busy() {
    let controller = Controller::new(IoctlDriver::new());
    let mut first = controller.open_session().expect("first open");
    first
        .control(Command::Allocate.code(), &mut UserBuffer::null())
        .unwrap();
    first.write_bytes(b"first session").unwrap();

    let second = controller.open_session();
    assert_eq!(second.unwrap_err(), DeviceError::Busy);

    // First session is untouched by the refused open
    assert_eq!(first.pread(0, 13).unwrap(), b"first session");
    first.close().unwrap();
}

/// Test the default content on open and its reset on reopen
#[test]
fn test_echo_resets_content_on_every_open() {
    let controller = Controller::new(EchoDriver::new());

    let mut session = controller.open_session().unwrap();
    assert_eq!(session.write_bytes(b"AB").unwrap(), 2);
    assert_eq!(session.pread(0, 2).unwrap(), b"AB");
    session.close().unwrap();

    let mut session = controller.open_session().unwrap();
    assert_eq!(session.pread(0, 2).unwrap(), &ECHO_DEFAULT_CONTENT[..2]);
    session.close().unwrap();
}

/// Test that reads return a prefix of the welcome content
#[test]
fn test_echo_read_prefixes() {
    let controller = Controller::new(EchoDriver::new());
    let mut session = controller.open_session().unwrap();

    for len in 0..=ECHO_DEFAULT_CONTENT.len() {
        assert_eq!(session.pread(0, len).unwrap(), &ECHO_DEFAULT_CONTENT[..len]);
    }
}

/// Test that reads never exceed capacity - offset
#[test]
fn test_read_bounded_by_remaining_capacity() {
    let controller = Controller::new(EchoDriver::new());
    let mut session = controller.open_session().unwrap();

    for offset in [0, 1, 0x80, ECHO_BUF_SZ - 1, ECHO_BUF_SZ] {
        let data = session.pread(offset, 2 * ECHO_BUF_SZ).unwrap();
        assert_eq!(data.len(), ECHO_BUF_SZ - offset);
        assert_eq!(session.position(), ECHO_BUF_SZ);
    }
}

/// Test sequential reads advance the cursor
#[test]
fn test_sequential_reads_advance_cursor() {
    let controller = Controller::new(EchoDriver::new());
    let mut session = controller.open_session().unwrap();
    let mut out = [0u8; 8];

    let n = session.read(&mut UserBuffer::from_mut(&mut out), 8).unwrap();
    assert_eq!(n, 8);
    assert_eq!(&out, &ECHO_DEFAULT_CONTENT[..8]);

    let n = session.read(&mut UserBuffer::from_mut(&mut out), 8).unwrap();
    assert_eq!(n, 8);
    assert_eq!(&out, &ECHO_DEFAULT_CONTENT[8..16]);
    assert_eq!(session.position(), 16);
}

/// Test that a cursor survives nothing across sessions
#[test]
fn test_cursor_reset_on_open() {
    let controller = Controller::new(EchoDriver::new());
    let mut session = controller.open_session().unwrap();
    session.seek(0x40);
    session.close().unwrap();

    let session = controller.open_session().unwrap();
    assert_eq!(session.position(), 0);
}

/// Test write then read round trip and capacity clamp
#[test]
fn test_write_read_round_trip() {
    let controller = Controller::new(EchoDriver::new());
    let mut session = controller.open_session().unwrap();

    let payload = b"round trip through the device";
    assert_eq!(session.write_bytes(payload).unwrap(), payload.len());
    assert_eq!(session.pread(0, payload.len()).unwrap(), payload);

    let oversized = vec![0x5a; ECHO_BUF_SZ + 10];
    assert_eq!(session.write_bytes(&oversized).unwrap(), ECHO_BUF_SZ);
}

/// Test that a short caller region is a copy fault, not a short copy
#[test]
fn test_short_user_regions_fault() {
    let controller = Controller::new(EchoDriver::new());
    let mut session = controller.open_session().unwrap();

    let mut out = [0u8; 4];
    let err = session
        .read(&mut UserBuffer::from_mut(&mut out), 16)
        .unwrap_err();
    assert_eq!(err, DeviceError::CopyFault { needed: 16, available: 4 });
    assert_eq!(err.errno(), -14);
    assert_eq!(session.position(), 0);

    let err = session.write(&UserBuffer::from_slice(b"ab"), 8).unwrap_err();
    assert!(matches!(err, DeviceError::CopyFault { .. }));
    assert_eq!(session.pread(0, 2).unwrap(), &ECHO_DEFAULT_CONTENT[..2]);
}

/// Test the original exerciser sequence against the ioctl device
#[test]
fn test_ioctl_command_sequence() {
    let controller = Controller::new(IoctlDriver::new());
    let mut session = controller.open_session().unwrap();

    let reply = session
        .control(Command::GetFixedValue.code(), &mut UserBuffer::null())
        .unwrap();
    assert_eq!(reply, ControlReply::Value(0x1234_5678));

    session
        .control(Command::Allocate.code(), &mut UserBuffer::null())
        .unwrap();

    let mut dump = vec![0xffu8; IOCTL_BUF_SZ];
    session
        .control(Command::ReadAll.code(), &mut UserBuffer::from_mut(&mut dump))
        .unwrap();
    assert!(dump.iter().all(|&b| b == 0));

    let mut message = vec![0u8; IOCTL_BUF_SZ];
    message[..16].copy_from_slice(b"Hello World Yo!\n");
    session
        .control(Command::WriteAll.code(), &mut UserBuffer::from_slice(&message))
        .unwrap();
    session
        .control(Command::ReadAll.code(), &mut UserBuffer::from_mut(&mut dump))
        .unwrap();
    assert_eq!(dump, message);

    assert_eq!(
        session.control(Command::Free.code(), &mut UserBuffer::null()),
        Ok(ControlReply::Done)
    );
    assert_eq!(
        session.control(Command::ReadAll.code(), &mut UserBuffer::from_mut(&mut dump)),
        Err(DeviceError::NotAllocated)
    );
    assert_eq!(session.pread(0, 4), Err(DeviceError::NotAllocated));
    assert_eq!(session.write_bytes(b"late"), Err(DeviceError::NotAllocated));
}

/// Test that unknown codes are ignored without touching the buffer
#[test]
fn test_ioctl_unknown_codes_are_noops() {
    let controller = Controller::new(IoctlDriver::new());
    let mut session = controller.open_session().unwrap();

    for code in [0x0, 0xdead5, 0xdeadbeef] {
        assert_eq!(
            session.control(code, &mut UserBuffer::null()),
            Ok(ControlReply::Ignored)
        );
    }
    assert_eq!(controller.buffer().state(), BufferState::Empty);
}

/// Test that the ioctl buffer outlives the session that allocated it
#[test]
fn test_ioctl_buffer_shared_across_sessions() {
    let controller = Controller::new(IoctlDriver::new());

    let mut session = controller.open_session().unwrap();
    session
        .control(Command::Allocate.code(), &mut UserBuffer::null())
        .unwrap();
    session.write_bytes(b"persist").unwrap();
    session.close().unwrap();

    assert_eq!(
        controller.buffer().state(),
        BufferState::Allocated(Owner::Controller)
    );

    let mut session = controller.open_session().unwrap();
    assert_eq!(session.pread(0, 7).unwrap(), b"persist");
    session
        .control(Command::Free.code(), &mut UserBuffer::null())
        .unwrap();
    session.close().unwrap();

    // Freed by one session means absent for the next
    let mut session = controller.open_session().unwrap();
    assert_eq!(session.pread(0, 1), Err(DeviceError::NotAllocated));
}

/// Test the lenient policy accepts repeated frees
#[test]
fn test_lenient_free_accepts_double_free() {
    let controller = Controller::new(IoctlDriver::new());
    let mut session = controller.open_session().unwrap();
    let free = Command::Free.code();

    assert_eq!(session.control(free, &mut UserBuffer::null()), Ok(ControlReply::AlreadyFreed));
    session
        .control(Command::Allocate.code(), &mut UserBuffer::null())
        .unwrap();
    assert_eq!(session.control(free, &mut UserBuffer::null()), Ok(ControlReply::Done));
    assert_eq!(session.control(free, &mut UserBuffer::null()), Ok(ControlReply::AlreadyFreed));
}

/// Test the strict policy rejects frees of an absent buffer
#[test]
fn test_strict_free_rejects_double_free() {
    let driver = IoctlDriver::with_policy("strict", IOCTL_BUF_SZ, FreePolicy::Strict);
    let controller = Controller::new(driver);
    let mut session = controller.open_session().unwrap();
    let free = Command::Free.code();

    assert_eq!(
        session.control(free, &mut UserBuffer::null()),
        Err(DeviceError::NotAllocated)
    );
    session
        .control(Command::Allocate.code(), &mut UserBuffer::null())
        .unwrap();
    assert_eq!(session.control(free, &mut UserBuffer::null()), Ok(ControlReply::Done));

    let err = session.control(free, &mut UserBuffer::null()).unwrap_err();
    assert_eq!(err, DeviceError::DoubleFree);
    assert_eq!(controller.buffer().state(), BufferState::Freed);

    // The session stays usable after the rejected free
    session
        .control(Command::Allocate.code(), &mut UserBuffer::null())
        .unwrap();
    assert!(controller.buffer().is_allocated());
}

/// Test built from a TOML device description
#[test]
fn test_controller_from_config() {
    let config: DeviceConfig = toml::from_str(
        r#"
        variant = "echo"
        name = "greeter"
        capacity = 16
        default_content = "hi there"
        "#,
    )
    .unwrap();

    let controller = Controller::new(config.echo_driver().unwrap());
    assert_eq!(controller.name(), "greeter");
    let mut session = controller.open_session().unwrap();
    assert_eq!(session.pread(0, 32).unwrap(), b"hi there\0\0\0\0\0\0\0\0");
}

/// Test that concurrent opens admit exactly one session
#[test]
fn test_concurrent_open_admits_one() {
    const CLIENTS: usize = 8;

    let controller = Controller::new(EchoDriver::new());
    let attempted = Barrier::new(CLIENTS);
    let admitted = AtomicUsize::new(0);
    let refused = AtomicUsize::new(0);

    crossbeam::scope(|scope| {
        for _ in 0..CLIENTS {
            scope.spawn(|_| {
                let session = controller.open_session();
                match &session {
                    Ok(_) => admitted.fetch_add(1, Ordering::SeqCst),
                    Err(DeviceError::Busy) => refused.fetch_add(1, Ordering::SeqCst),
                    Err(err) => panic!("unexpected open error: {err}"),
                };
                // Hold any admitted session until every client has tried
                attempted.wait();
                drop(session);
            });
        }
    })
    .unwrap();

    assert_eq!(admitted.load(Ordering::SeqCst), 1);
    assert_eq!(refused.load(Ordering::SeqCst), CLIENTS - 1);
    assert!(!controller.is_open());
    assert_eq!(controller.gate().permits(), 1);
}

/// Test that sessions on different threads run one after another
#[test]
fn test_serialised_sessions_across_threads() {
    const ROUNDS: usize = 50;

    let controller = Controller::new(IoctlDriver::new());
    let completed = AtomicUsize::new(0);

    crossbeam::scope(|scope| {
        for worker in 0..4u8 {
            let controller = &controller;
            let completed = &completed;
            scope.spawn(move |_| {
                let mut done = 0;
                while done < ROUNDS {
                    let Ok(mut session) = controller.open_session() else {
                        std::thread::yield_now();
                        continue;
                    };
                    assert!(controller.is_open());
                    session
                        .control(Command::Allocate.code(), &mut UserBuffer::null())
                        .unwrap();
                    session.write_bytes(&[worker; 4]).unwrap();
                    assert_eq!(session.pread(0, 4).unwrap(), [worker; 4]);
                    session.close().unwrap();
                    done += 1;
                }
                completed.fetch_add(done, Ordering::SeqCst);
            });
        }
    })
    .unwrap();

    assert_eq!(completed.load(Ordering::SeqCst), 4 * ROUNDS);
    assert_eq!(controller.gate().permits(), 1);
}
