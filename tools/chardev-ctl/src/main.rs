//! chardev-ctl - exercise chardev controllers from the command line
//!
//! Commands:
//! - `chardev-ctl demo` - Run the standard ioctl command sequence
//! - `chardev-ctl echo [--write TEXT]` - Talk to an echo device
//! - `chardev-ctl ioctl <CODE>...` - Issue raw control codes in one session
//! - `chardev-ctl info` - Show the effective device configuration

mod config;

use anyhow::{Context, Result};
use chardev::{
    CharDriver, Command, ControlReply, Controller, DeviceConfig, DeviceError, IoctlDriver, Session,
    UserBuffer, Variant,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

const DEMO_MESSAGE: &[u8] = b"Hello World Yo!\n";

#[derive(Parser)]
#[command(name = "chardev-ctl")]
#[command(version)]
#[command(about = "Exercise single-client character device controllers", long_about = None)]
struct Cli {
    /// Device config file (TOML with a [device] section)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the standard ioctl sequence: value, allocate, write, dump, free, dump
    Demo,

    /// Open an echo device, show its content, optionally write and read back
    Echo {
        /// Text to write after the initial read
        #[arg(short, long)]
        write: Option<String>,
    },

    /// Issue raw control codes (hex or decimal) in one ioctl session
    Ioctl {
        /// Control codes, e.g. 0xdead1 0xdead3
        #[arg(required = true)]
        codes: Vec<String>,

        /// Payload for WRITE_ALL, zero padded to the buffer capacity
        #[arg(short, long, default_value = "")]
        data: String,
    },

    /// Show the effective device configuration
    Info,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Demo => {
            let config = config::load(config_path, Variant::Ioctl)?;
            run_demo(config.ioctl_driver()?)?;
        }

        Commands::Echo { write } => {
            let config = config::load(config_path, Variant::Echo)?;
            run_echo(&config, write.as_deref())?;
        }

        Commands::Ioctl { codes, data } => {
            let codes = codes
                .iter()
                .map(|code| parse_code(code))
                .collect::<Result<Vec<_>>>()?;
            let config = config::load(config_path, Variant::Ioctl)?;
            run_ioctl(config.ioctl_driver()?, &codes, data.as_bytes())?;
        }

        Commands::Info => {
            let config = config::load(config_path, Variant::Ioctl)?;
            show_info(&config);
        }
    }

    Ok(())
}

fn run_demo(driver: IoctlDriver) -> Result<()> {
    let controller = Controller::new(driver);
    println!("{} Opening {}", "[>]".green(), controller.name().bold());
    let mut session = controller.open_session().context("Failed to open device")?;

    let sequence = [
        Command::GetFixedValue,
        Command::Allocate,
        Command::WriteAll,
        Command::ReadAll,
        Command::Free,
        Command::ReadAll,
    ];
    for command in sequence {
        if let Err(err) = issue(&mut session, command.code(), DEMO_MESSAGE) {
            println!("{} {:?}: {} ({})", "[!]".yellow(), command, err, err.errno());
        }
    }

    println!("{} Closing {}", "[>]".green(), controller.name().bold());
    session.close()?;
    controller.shutdown();
    Ok(())
}

fn run_echo(config: &DeviceConfig, write: Option<&str>) -> Result<()> {
    let controller = Controller::new(config.echo_driver()?);
    let mut session = controller.open_session().context("Failed to open device")?;

    let content = session.pread(0, config.content().len())?;
    println!("{} {}", "read:".bold(), String::from_utf8_lossy(&content).trim_end());

    if let Some(text) = write {
        let written = session.write_bytes(text.as_bytes())?;
        let back = session.pread(0, written)?;
        println!("{} {} bytes", "wrote:".bold(), written);
        println!("{} {}", "read:".bold(), String::from_utf8_lossy(&back));
    }

    session.close()?;
    controller.shutdown();
    Ok(())
}

fn run_ioctl(driver: IoctlDriver, codes: &[u32], data: &[u8]) -> Result<()> {
    let controller = Controller::new(driver);
    let mut session = controller.open_session().context("Failed to open device")?;

    for &code in codes {
        issue(&mut session, code, data)
            .with_context(|| format!("Control code {:#x} failed", code))?;
    }

    session.close()?;
    controller.shutdown();
    Ok(())
}

/// Issue one control code, supplying the caller region the command expects
///
/// Only READ_ALL and WRITE_ALL get a capacity-sized region; `data` is padded
/// to the capacity for WRITE_ALL.
fn issue<D: CharDriver>(
    session: &mut Session<'_, D>,
    code: u32,
    data: &[u8],
) -> Result<ControlReply, DeviceError> {
    let capacity = session.controller().buffer().capacity();
    match Command::from_code(code) {
        Some(Command::ReadAll) => {
            let mut dump = zeroed(capacity)?;
            let reply = session.control(code, &mut UserBuffer::from_mut(&mut dump))?;
            println!("{} {:#x} -> dump", "[+]".green(), code);
            for line in dump_lines(&dump) {
                println!("    {}", line);
            }
            Ok(reply)
        }
        Some(Command::WriteAll) => {
            let payload = padded(data, capacity)?;
            let reply = session.control(code, &mut UserBuffer::from_slice(&payload))?;
            println!("{} {:#x} -> wrote {} bytes", "[+]".green(), code, payload.len());
            Ok(reply)
        }
        _ => {
            let reply = session.control(code, &mut UserBuffer::null())?;
            match reply {
                ControlReply::Value(value) => {
                    println!("{} {:#x} -> value {:#010x}", "[+]".green(), code, value)
                }
                other => println!("{} {:#x} -> {:?}", "[+]".green(), code, other),
            }
            Ok(reply)
        }
    }
}

fn show_info(config: &DeviceConfig) {
    println!("{}", "Device configuration".bold());
    println!("  Variant:     {:?}", config.variant);
    println!("  Name:        {}", config.name());
    println!("  Capacity:    {:#x} bytes", config.capacity());
    println!("  Free policy: {:?}", config.free_policy);
    if config.variant == Variant::Echo {
        println!(
            "  Content:     {:?}",
            String::from_utf8_lossy(config.content())
        );
    }
}

fn parse_code(s: &str) -> Result<u32> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).with_context(|| format!("Invalid hex code '{}'", s))
    } else {
        s.parse::<u32>()
            .with_context(|| format!("Invalid decimal code '{}'", s))
    }
}

/// `len` zero bytes, or `OutOfMemory` if they cannot be reserved
fn zeroed(len: usize) -> Result<Vec<u8>, DeviceError> {
    let mut out = Vec::new();
    out.try_reserve_exact(len)
        .map_err(|_| DeviceError::OutOfMemory { requested: len })?;
    out.resize(len, 0);
    Ok(out)
}

/// `data` zero padded (or truncated) to exactly `capacity` bytes
fn padded(data: &[u8], capacity: usize) -> Result<Vec<u8>, DeviceError> {
    let mut out = zeroed(capacity)?;
    let len = data.len().min(capacity);
    out[..len].copy_from_slice(&data[..len]);
    Ok(out)
}

/// Non-zero 64-bit words of `dump` with their byte offsets
fn dump_lines(dump: &[u8]) -> Vec<String> {
    dump.chunks(8)
        .enumerate()
        .filter_map(|(index, chunk)| {
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            let value = u64::from_ne_bytes(word);
            (value != 0).then(|| format!("[IDX + {:4}] -> {:#18x}", index * 8, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code() {
        assert_eq!(parse_code("0xdead3").unwrap(), 0xdead3);
        assert_eq!(parse_code("0XDEAD0").unwrap(), 0xdead0);
        assert_eq!(parse_code("912045").unwrap(), 912045);
        assert!(parse_code("0xzz").is_err());
        assert!(parse_code("dead").is_err());
    }

    #[test]
    fn test_padded() {
        assert_eq!(padded(b"ab", 4).unwrap(), b"ab\0\0");
        assert_eq!(padded(b"abcdef", 4).unwrap(), b"abcd");
        assert_eq!(
            padded(b"ab", usize::MAX),
            Err(DeviceError::OutOfMemory { requested: usize::MAX })
        );
    }

    #[test]
    fn test_dump_lines_skip_zero_words() {
        let mut dump = vec![0u8; 32];
        dump[8] = 1;
        let lines = dump_lines(&dump);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[IDX +    8]"));
    }

    #[test]
    fn test_issue_sequence() {
        let controller = Controller::new(IoctlDriver::new());
        let mut session = controller.open_session().unwrap();

        assert_eq!(
            issue(&mut session, Command::GetFixedValue.code(), DEMO_MESSAGE),
            Ok(ControlReply::Value(chardev::FIXED_VALUE))
        );
        assert_eq!(
            issue(&mut session, Command::ReadAll.code(), DEMO_MESSAGE),
            Err(DeviceError::NotAllocated)
        );
        issue(&mut session, Command::Allocate.code(), DEMO_MESSAGE).unwrap();
        issue(&mut session, Command::WriteAll.code(), DEMO_MESSAGE).unwrap();
        assert_eq!(session.pread(0, DEMO_MESSAGE.len()).unwrap(), DEMO_MESSAGE);
        assert_eq!(issue(&mut session, 0x1234, DEMO_MESSAGE), Ok(ControlReply::Ignored));
    }

    #[test]
    fn test_issue_with_unallocatable_capacity() {
        let driver = IoctlDriver::with_policy("huge", usize::MAX, chardev::FreePolicy::Lenient);
        let controller = Controller::new(driver);
        let mut session = controller.open_session().unwrap();

        assert_eq!(
            issue(&mut session, Command::GetFixedValue.code(), b""),
            Ok(ControlReply::Value(chardev::FIXED_VALUE))
        );
        assert_eq!(
            issue(&mut session, Command::ReadAll.code(), b""),
            Err(DeviceError::OutOfMemory { requested: usize::MAX })
        );
        assert_eq!(
            issue(&mut session, Command::WriteAll.code(), b"hi"),
            Err(DeviceError::OutOfMemory { requested: usize::MAX })
        );
        assert_eq!(
            issue(&mut session, Command::Allocate.code(), b""),
            Err(DeviceError::OutOfMemory { requested: usize::MAX })
        );
    }
}
