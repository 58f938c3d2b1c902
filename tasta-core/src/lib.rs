//! Control core of the tasta two-button USB keyboard.
//!
//! Everything here is hardware-independent so it can run on the ATtiny85
//! firmware and be tested on the host. The board and the software USB driver
//! plug in through the traits in [`keys`], [`calibration`], [`poll`] and
//! [`transport`].

#![cfg_attr(not(test), no_std)]

pub mod calibration;
pub mod control;
pub mod device;
pub mod keycode;
pub mod keymap;
pub mod keys;
pub mod poll;
pub mod report;
pub mod transport;

#[cfg(test)]
mod testing;

pub use device::Device;
pub use keycode::Keycode;
pub use keymap::{Keymap, DEFAULT_KEYMAP};
pub use keys::KeyState;
pub use poll::PollLoop;
pub use report::{KeyboardReport, ReportError, HID_REPORT_DESCRIPTOR};
