//! Board configuration for the ATtiny85 build.
//!
//! Pin assignment (all on port B):
//!   PB0  LED (sink, low = on)
//!   PB1  USB D-
//!   PB2  USB D+ (INT0)
//!   PB3  button 2
//!   PB4  button 1
//!   PB5  reset (unused)

use tasta_core::calibration::calibration_target;
use tasta_core::Keymap;

/// Core clock after calibration: the 64 MHz PLL divided by four.
pub const F_CPU: u32 = 16_500_000;

/// Frame length the calibration aims for at `F_CPU`.
pub const CALIBRATION_TARGET: u16 = calibration_target(F_CPU);

pub const CALIBRATION_ADDR: u16 = tasta_core::calibration::EEPROM_ADDR;

pub const BUTTON1_BIT: u8 = 4;
pub const BUTTON2_BIT: u8 = 3;
pub const LED_BIT: u8 = 0;

/// D+ and D- on port B. Must match `usbdrv/usbconfig.h`.
pub const USB_MASK: u8 = (1 << 1) | (1 << 2);

/// Fake disconnect long enough for the host to notice (> 250 ms).
pub const DISCONNECT_MS: u16 = 255;

/// Timer1 clock select: CK/1024. 16.5 MHz / 1024 / 256 gives ~63 Hz overflows.
pub const TIMER1_PRESCALE_1024: u8 = 0x0B;

pub static KEYMAP: &Keymap = &tasta_core::DEFAULT_KEYMAP;
