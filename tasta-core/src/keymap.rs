//! Mapping from input bits to HID usages.
//!
//! Each input bit owns a binding: a list of keycodes that are held while the
//! button is closed. Modifier keycodes land in the modifier byte and take no
//! keycode slot; everything else takes one slot.

use crate::keys::NUM_KEYS;
use crate::keycode::Keycode;

/// Keycodes produced by one button.
pub type KeyBinding = &'static [Keycode];

/// One binding per input bit, bit 0 first.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Keymap {
    pub bindings: [KeyBinding; NUM_KEYS],
}

impl Keymap {
    pub const fn new(bindings: [KeyBinding; NUM_KEYS]) -> Self {
        Self { bindings }
    }

    /// Binding for input bit `bit`, empty when out of range.
    pub fn binding(&self, bit: usize) -> KeyBinding {
        self.bindings.get(bit).copied().unwrap_or(&[])
    }
}

/// Button 1 holds the left "Windows" key, button 2 taps Enter.
pub static DEFAULT_KEYMAP: Keymap = Keymap::new([&[Keycode::LGui], &[Keycode::Enter]]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bindings() {
        assert_eq!(DEFAULT_KEYMAP.binding(0), &[Keycode::LGui]);
        assert_eq!(DEFAULT_KEYMAP.binding(1), &[Keycode::Enter]);
    }

    #[test]
    fn out_of_range_bit_is_unbound() {
        assert!(DEFAULT_KEYMAP.binding(NUM_KEYS).is_empty());
    }
}
