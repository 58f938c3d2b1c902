//! HID keyboard input report.
//!
//! The device uses a cut-down report without the boot protocol's reserved
//! byte or LED output: one modifier byte followed by two keycode slots.

use crate::keycode::Keycode;
use crate::keymap::Keymap;
use crate::keys::{KeyState, NUM_KEYS};

/// Number of keycode slots in a report.
pub const KEY_SLOTS: usize = 2;

/// Report size on the wire.
pub const REPORT_LEN: usize = 1 + KEY_SLOTS;

/// HID report descriptor. Byte-exact contract with host HID drivers.
pub const HID_REPORT_DESCRIPTOR: [u8; 35] = [
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    // Modifier keys (8 bits)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0xE0, //   Usage Minimum (224) - LCtrl
    0x29, 0xE7, //   Usage Maximum (231) - RGui
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    // Keycodes (2 bytes)
    0x95, 0x02, //   Report Count (2)
    0x75, 0x08, //   Report Size (8)
    0x25, 0x65, //   Logical Maximum (101)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0x65, //   Usage Maximum (101) - Application
    0x81, 0x00, //   Input (Data, Array)
    0xC0, // End Collection
];

/// Error decoding a report received from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportError {
    #[error("report must be {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

/// Byte 0: modifier keys bitmask
/// Bytes 1-2: up to 2 simultaneous keycodes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport([u8; REPORT_LEN]);

impl KeyboardReport {
    pub const fn empty() -> Self {
        Self([0; REPORT_LEN])
    }

    pub const fn new(modifiers: u8, keys: [u8; KEY_SLOTS]) -> Self {
        Self([modifiers, keys[0], keys[1]])
    }

    /// Rebuild this report in place from the pressed buttons.
    ///
    /// Modifiers are OR-ed together. Other keycodes fill the slots in input
    /// bit order; if they do not fit, every slot carries Error Rollover and
    /// the modifier byte is still reported.
    pub fn build(&mut self, keys: KeyState, keymap: &Keymap) {
        let mut modifiers = 0u8;
        let mut slots = [0u8; KEY_SLOTS];
        let mut key_idx = 0usize;
        let mut overflow = false;

        for bit in 0..NUM_KEYS {
            if !keys.is_pressed(bit) {
                continue;
            }

            for &kc in keymap.binding(bit) {
                if kc.is_modifier() {
                    modifiers |= kc.modifier_bit();
                } else if let Some(slot) = slots.get_mut(key_idx) {
                    *slot = kc as u8;
                    key_idx += 1;
                } else {
                    overflow = true;
                }
            }
        }

        if overflow {
            slots = [Keycode::ErrorRollOver as u8; KEY_SLOTS];
        }
        *self = Self::new(modifiers, slots);
    }

    pub const fn modifiers(&self) -> u8 {
        self.0[0]
    }

    /// The keycode slots, including empty ones.
    pub fn keys(&self) -> &[u8] {
        &self.0[1..]
    }

    /// Wire representation, also the Get_Report response.
    pub const fn as_bytes(&self) -> &[u8; REPORT_LEN] {
        &self.0
    }

    /// Whether the device signalled too many keys.
    pub fn is_rollover(&self) -> bool {
        self.keys()
            .iter()
            .all(|&k| k == Keycode::ErrorRollOver as u8)
    }

    /// Occupied keycode slots.
    pub fn keycodes(&self) -> impl Iterator<Item = u8> + '_ {
        self.keys().iter().copied().filter(|&k| k != 0)
    }
}

impl TryFrom<&[u8]> for KeyboardReport {
    type Error = ReportError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; REPORT_LEN] = bytes.try_into().map_err(|_| ReportError::Length {
            expected: REPORT_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(bytes))
    }
}
