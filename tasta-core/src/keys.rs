//! Button sampling.
//!
//! Both buttons pull their line to ground when closed, so a low level means
//! pressed. No debouncing happens here; the poll loop only reacts to changes
//! between consecutive samples.

/// Number of physical buttons.
pub const NUM_KEYS: usize = 2;

/// Pressed buttons as a bitmask (bit 0 = button 1, bit 1 = button 2).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyState(u8);

impl KeyState {
    pub const NONE: KeyState = KeyState(0);

    /// Build from a raw mask; bits above `NUM_KEYS` are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & ((1 << NUM_KEYS) - 1))
    }

    /// Convert line levels (`true` = high) into pressed bits.
    pub fn from_active_low(levels: [bool; NUM_KEYS]) -> Self {
        let mut bits = 0;
        for (bit, high) in levels.iter().enumerate() {
            if !high {
                bits |= 1 << bit;
            }
        }
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_pressed(self, bit: usize) -> bool {
        bit < NUM_KEYS && self.0 & (1 << bit) != 0
    }

    pub const fn any(self) -> bool {
        self.0 != 0
    }
}

/// The two input lines and the status LED.
pub trait Buttons {
    /// Current level of each input line, `true` = high (released).
    fn levels(&mut self) -> [bool; NUM_KEYS];

    fn set_indicator(&mut self, on: bool);
}

/// Read the buttons and light the indicator while any of them is held.
pub fn sample<B: Buttons>(buttons: &mut B) -> KeyState {
    let state = KeyState::from_active_low(buttons.levels());
    buttons.set_indicator(state.any());
    state
}
