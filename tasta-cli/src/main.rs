mod descriptor;
mod device;
mod hex;

use std::fs;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tasta_core::keycode::modifier;
use tasta_core::{KeyboardReport, Keycode, HID_REPORT_DESCRIPTOR};

use device::Keyboard;

/// Milliseconds per Set_Idle unit.
const IDLE_UNIT_MS: u32 = 4;

#[derive(Parser)]
#[command(name = "tasta")]
#[command(about = "Inspect and configure a tasta two-button keyboard")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// USB vendor ID (hex); defaults to obdev's shared keyboard pair
    #[arg(long, global = true, env = "TASTA_VID", value_parser = parse_hex_u16, default_value = "16c0")]
    vid: u16,

    /// USB product ID (hex)
    #[arg(long, global = true, env = "TASTA_PID", value_parser = parse_hex_u16, default_value = "27db")]
    pid: u16,

    /// Control transfer timeout in milliseconds
    #[arg(long, global = true, env = "TASTA_TIMEOUT_MS", default_value_t = 1000)]
    timeout_ms: u64,
}

#[derive(Subcommand)]
enum Command {
    /// List attached keyboards
    Detect,
    /// Read the current report with Get_Report
    Report,
    /// Read or change the idle rate
    Idle {
        #[command(subcommand)]
        action: IdleAction,
    },
    /// Print every report change until interrupted
    Watch {
        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 20)]
        interval_ms: u64,
    },
    /// Decode the HID report descriptor
    Descriptor {
        /// Fetch it from the device and compare with the built-in copy
        #[arg(long)]
        device: bool,
    },
    /// Show the calibration stored in an EEPROM dump (Intel HEX)
    Eeprom {
        /// Path to the dump, e.g. from `avrdude -U eeprom:r:dump.hex:i`
        dump: String,
    },
    /// Check that a firmware image fits the ATtiny85's flash
    Check {
        /// Path to the Intel HEX firmware file
        firmware: String,
    },
}

#[derive(Subcommand)]
enum IdleAction {
    /// Print the idle rate
    Get,
    /// Set the idle rate (0 = report on change only)
    Set {
        /// Rate in 4 ms units
        #[arg(required_unless_present = "ms", conflicts_with = "ms")]
        units: Option<u8>,
        /// Rate in milliseconds, rounded down to 4 ms units
        #[arg(long)]
        ms: Option<u32>,
    },
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hex id {s:?}: {e}"))
}

/// Convert milliseconds to idle units.
fn idle_units(ms: u32) -> Result<u8> {
    let units = ms / IDLE_UNIT_MS;
    if ms % IDLE_UNIT_MS != 0 {
        warn!(ms, rounded = units * IDLE_UNIT_MS, "idle rate rounded down");
    }
    u8::try_from(units).with_context(|| {
        format!(
            "{} ms exceeds the longest idle rate of {} ms",
            ms,
            u32::from(u8::MAX) * IDLE_UNIT_MS
        )
    })
}

fn describe_idle(rate: u8) -> String {
    match rate {
        0 => "0 (report on change only)".to_string(),
        n => format!("{} ({} ms)", n, u32::from(n) * IDLE_UNIT_MS),
    }
}

/// Human-readable report, e.g. `LGui + Enter`.
fn describe(report: &KeyboardReport) -> String {
    let mut parts: Vec<String> = modifier::NAMES
        .iter()
        .enumerate()
        .filter(|(bit, _)| report.modifiers() & (1u8 << *bit) != 0)
        .map(|(_, name)| name.to_string())
        .collect();

    if report.is_rollover() {
        parts.push("<rollover>".to_string());
    } else {
        parts.extend(report.keycodes().map(|usage| match Keycode::from_usage(usage) {
            Some(kc) => kc.display_name().to_string(),
            None => format!("0x{usage:02X}"),
        }));
    }

    if parts.is_empty() {
        "(none)".to_string()
    } else {
        parts.join(" + ")
    }
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("tasta={}", log_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let timeout = Duration::from_millis(cli.timeout_ms);
    let open = || Keyboard::open(cli.vid, cli.pid, timeout);

    match cli.command {
        Command::Detect => {
            let found = device::list(cli.vid, cli.pid)?;
            if found.is_empty() {
                println!("No keyboard {:04x}:{:04x} found.", cli.vid, cli.pid);
            }
            for dev in found {
                println!(
                    "Bus {:03} Device {:03}: {} {}",
                    dev.bus,
                    dev.address,
                    dev.manufacturer.as_deref().unwrap_or("?"),
                    dev.product.as_deref().unwrap_or("?"),
                );
            }
        }
        Command::Report => {
            let report = open()?.get_report()?;
            println!("{}  [{}]", describe(&report), hex_bytes(report.as_bytes()));
        }
        Command::Idle { action } => {
            let keyboard = open()?;
            match action {
                IdleAction::Get => println!("{}", describe_idle(keyboard.get_idle()?)),
                IdleAction::Set { units, ms } => {
                    let rate = match (units, ms) {
                        (Some(units), _) => units,
                        (None, Some(ms)) => idle_units(ms)?,
                        (None, None) => bail!("give a rate in units or --ms"),
                    };
                    keyboard.set_idle(rate)?;
                    info!(rate, "idle rate set");
                    println!("Idle rate set to {}", describe_idle(rate));
                }
            }
        }
        Command::Watch { interval_ms } => {
            let keyboard = open()?;
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
            pb.set_message("watching, Ctrl-C to stop");
            pb.enable_steady_tick(Duration::from_millis(100));

            let mut last: Option<KeyboardReport> = None;
            loop {
                let report = keyboard.get_report()?;
                if last != Some(report) {
                    pb.suspend(|| println!("{}", describe(&report)));
                    last = Some(report);
                }
                thread::sleep(Duration::from_millis(interval_ms));
            }
        }
        Command::Descriptor { device } => {
            let bytes = if device {
                open()?.report_descriptor()?
            } else {
                HID_REPORT_DESCRIPTOR.to_vec()
            };
            let items = descriptor::parse(&bytes).context("decoding report descriptor")?;
            for line in descriptor::render(&items) {
                println!("{}", line);
            }
            println!(
                "{} bytes, input report {} bits",
                bytes.len(),
                descriptor::input_bits(&items)
            );
            if device {
                if bytes[..] == HID_REPORT_DESCRIPTOR[..] {
                    println!("Matches the built-in descriptor.");
                } else {
                    bail!(
                        "device descriptor differs from the built-in one\n  device:   {}\n  built-in: {}",
                        hex_bytes(&bytes),
                        hex_bytes(&HID_REPORT_DESCRIPTOR)
                    );
                }
            }
        }
        Command::Eeprom { dump } => {
            let contents =
                fs::read_to_string(&dump).with_context(|| format!("reading {}", dump))?;
            let image = hex::Image::parse(&contents).context("parsing Intel HEX file")?;
            match image.stored_calibration()? {
                Some(value) => println!("Stored OSCCAL: 0x{:02X} ({})", value, value),
                None => println!("No calibration stored (cell erased)."),
            }
        }
        Command::Check { firmware } => {
            let contents = fs::read_to_string(&firmware)
                .with_context(|| format!("reading {}", firmware))?;
            let image = hex::Image::parse(&contents).context("parsing Intel HEX file")?;
            image.check_fits(hex::FLASH_SIZE)?;
            println!(
                "Firmware: {} bytes in {} segment(s), ends at 0x{:04X} of 0x{:04X} ({:.1}% used)",
                image.size(),
                image.segments().len(),
                image.end(),
                hex::FLASH_SIZE,
                f64::from(image.end()) * 100.0 / f64::from(hex::FLASH_SIZE)
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        let cli = Cli::try_parse_from(["tasta", "report"]).unwrap();
        assert_eq!(cli.vid, 0x16C0);
        assert_eq!(cli.pid, 0x27DB);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parse_hex_ids() {
        let cli = Cli::try_parse_from(["tasta", "--vid", "0x1234", "--pid", "ABCD", "detect"]).unwrap();
        assert_eq!(cli.vid, 0x1234);
        assert_eq!(cli.pid, 0xABCD);
        assert!(Cli::try_parse_from(["tasta", "--vid", "xyz", "detect"]).is_err());
    }

    #[test]
    fn idle_set_needs_exactly_one_rate() {
        assert!(Cli::try_parse_from(["tasta", "idle", "set"]).is_err());
        assert!(Cli::try_parse_from(["tasta", "idle", "set", "10", "--ms", "40"]).is_err());

        let cli = Cli::try_parse_from(["tasta", "idle", "set", "--ms", "500"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Idle {
                action: IdleAction::Set { units: None, ms: Some(500) }
            }
        ));
    }

    #[test]
    fn idle_units_from_ms() {
        assert_eq!(idle_units(0).unwrap(), 0);
        assert_eq!(idle_units(500).unwrap(), 125);
        assert_eq!(idle_units(7).unwrap(), 1);
        assert_eq!(idle_units(1020).unwrap(), 255);
        assert!(idle_units(1024).is_err());
    }

    #[test]
    fn describe_reports() {
        assert_eq!(describe(&KeyboardReport::empty()), "(none)");
        assert_eq!(
            describe(&KeyboardReport::new(modifier::GUI_LEFT, [Keycode::Enter as u8, 0])),
            "LGui + Enter"
        );
        assert_eq!(
            describe(&KeyboardReport::new(modifier::SHIFT_LEFT, [1, 1])),
            "LShift + <rollover>"
        );
    }

    #[test]
    fn describe_idle_rates() {
        assert_eq!(describe_idle(0), "0 (report on change only)");
        assert_eq!(describe_idle(125), "125 (500 ms)");
    }
}
