//! USB HID keycodes.
//!
//! See USB HID Usage Tables, Section 10 (Keyboard/Keypad Page 0x07). The
//! report descriptor only declares usages 0..=101 for the keycode slots, plus
//! the eight modifier usages which travel as bits in the modifier byte.

/// Modifier byte bits (bit 0 = Left Control ... bit 7 = Right GUI).
pub mod modifier {
    pub const CONTROL_LEFT: u8 = 1 << 0;
    pub const SHIFT_LEFT: u8 = 1 << 1;
    pub const ALT_LEFT: u8 = 1 << 2;
    /// "Windows" key.
    pub const GUI_LEFT: u8 = 1 << 3;
    pub const CONTROL_RIGHT: u8 = 1 << 4;
    pub const SHIFT_RIGHT: u8 = 1 << 5;
    pub const ALT_RIGHT: u8 = 1 << 6;
    pub const GUI_RIGHT: u8 = 1 << 7;

    /// Short names in bit order, for printing a modifier byte.
    pub const NAMES: [&str; 8] = [
        "LCtrl", "LShift", "LAlt", "LGui", "RCtrl", "RShift", "RAlt", "RGui",
    ];
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Keycode {
    /// Empty slot
    NoEvent = 0x00,
    /// Sent in every slot when too many keys are held
    ErrorRollOver = 0x01,

    // Letters
    A = 0x04,
    B = 0x05,
    C = 0x06,
    D = 0x07,
    E = 0x08,
    F = 0x09,
    G = 0x0A,
    H = 0x0B,
    I = 0x0C,
    J = 0x0D,
    K = 0x0E,
    L = 0x0F,
    M = 0x10,
    N = 0x11,
    O = 0x12,
    P = 0x13,
    Q = 0x14,
    R = 0x15,
    S = 0x16,
    T = 0x17,
    U = 0x18,
    V = 0x19,
    W = 0x1A,
    X = 0x1B,
    Y = 0x1C,
    Z = 0x1D,

    // Numbers
    N1 = 0x1E,
    N2 = 0x1F,
    N3 = 0x20,
    N4 = 0x21,
    N5 = 0x22,
    N6 = 0x23,
    N7 = 0x24,
    N8 = 0x25,
    N9 = 0x26,
    N0 = 0x27,

    // Control keys
    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,

    // Function keys
    F1 = 0x3A,
    F2 = 0x3B,
    F3 = 0x3C,
    F4 = 0x3D,
    F5 = 0x3E,
    F6 = 0x3F,
    F7 = 0x40,
    F8 = 0x41,
    F9 = 0x42,
    F10 = 0x43,
    F11 = 0x44,
    F12 = 0x45,

    // Navigation
    PrintScreen = 0x46,
    Pause = 0x48,
    Home = 0x4A,
    PageUp = 0x4B,
    Delete = 0x4C,
    End = 0x4D,
    PageDown = 0x4E,
    Right = 0x4F,
    Left = 0x50,
    Down = 0x51,
    Up = 0x52,

    /// Last usage the report descriptor declares
    Application = 0x65,

    // Modifiers (used in the modifier byte, not in keycode slots)
    LCtrl = 0xE0,
    LShift = 0xE1,
    LAlt = 0xE2,
    LGui = 0xE3,
    RCtrl = 0xE4,
    RShift = 0xE5,
    RAlt = 0xE6,
    RGui = 0xE7,
}

impl Keycode {
    /// Every variant, in declaration order.
    pub const ALL: [Keycode; 75] = [
        Keycode::NoEvent,
        Keycode::ErrorRollOver,
        Keycode::A,
        Keycode::B,
        Keycode::C,
        Keycode::D,
        Keycode::E,
        Keycode::F,
        Keycode::G,
        Keycode::H,
        Keycode::I,
        Keycode::J,
        Keycode::K,
        Keycode::L,
        Keycode::M,
        Keycode::N,
        Keycode::O,
        Keycode::P,
        Keycode::Q,
        Keycode::R,
        Keycode::S,
        Keycode::T,
        Keycode::U,
        Keycode::V,
        Keycode::W,
        Keycode::X,
        Keycode::Y,
        Keycode::Z,
        Keycode::N1,
        Keycode::N2,
        Keycode::N3,
        Keycode::N4,
        Keycode::N5,
        Keycode::N6,
        Keycode::N7,
        Keycode::N8,
        Keycode::N9,
        Keycode::N0,
        Keycode::Enter,
        Keycode::Escape,
        Keycode::Backspace,
        Keycode::Tab,
        Keycode::Space,
        Keycode::F1,
        Keycode::F2,
        Keycode::F3,
        Keycode::F4,
        Keycode::F5,
        Keycode::F6,
        Keycode::F7,
        Keycode::F8,
        Keycode::F9,
        Keycode::F10,
        Keycode::F11,
        Keycode::F12,
        Keycode::PrintScreen,
        Keycode::Pause,
        Keycode::Home,
        Keycode::PageUp,
        Keycode::Delete,
        Keycode::End,
        Keycode::PageDown,
        Keycode::Right,
        Keycode::Left,
        Keycode::Down,
        Keycode::Up,
        Keycode::Application,
        Keycode::LCtrl,
        Keycode::LShift,
        Keycode::LAlt,
        Keycode::LGui,
        Keycode::RCtrl,
        Keycode::RShift,
        Keycode::RAlt,
        Keycode::RGui,
    ];

    /// Check if this keycode is a modifier (LCtrl..RGui).
    pub fn is_modifier(self) -> bool {
        let v = self as u8;
        (0xE0..=0xE7).contains(&v)
    }

    /// Get the modifier bit mask (bit 0 = LCtrl, bit 7 = RGui).
    pub fn modifier_bit(self) -> u8 {
        if self.is_modifier() {
            1 << (self as u8 - 0xE0)
        } else {
            0
        }
    }

    /// Look up a keycode by its usage ID.
    pub fn from_usage(usage: u8) -> Option<Keycode> {
        Self::ALL.iter().copied().find(|kc| *kc as u8 == usage)
    }

    /// Display name used by the host tool when decoding reports.
    pub fn display_name(self) -> &'static str {
        match self {
            Keycode::NoEvent => "",
            Keycode::ErrorRollOver => "ERR",
            Keycode::A => "A",
            Keycode::B => "B",
            Keycode::C => "C",
            Keycode::D => "D",
            Keycode::E => "E",
            Keycode::F => "F",
            Keycode::G => "G",
            Keycode::H => "H",
            Keycode::I => "I",
            Keycode::J => "J",
            Keycode::K => "K",
            Keycode::L => "L",
            Keycode::M => "M",
            Keycode::N => "N",
            Keycode::O => "O",
            Keycode::P => "P",
            Keycode::Q => "Q",
            Keycode::R => "R",
            Keycode::S => "S",
            Keycode::T => "T",
            Keycode::U => "U",
            Keycode::V => "V",
            Keycode::W => "W",
            Keycode::X => "X",
            Keycode::Y => "Y",
            Keycode::Z => "Z",
            Keycode::N1 => "1",
            Keycode::N2 => "2",
            Keycode::N3 => "3",
            Keycode::N4 => "4",
            Keycode::N5 => "5",
            Keycode::N6 => "6",
            Keycode::N7 => "7",
            Keycode::N8 => "8",
            Keycode::N9 => "9",
            Keycode::N0 => "0",
            Keycode::Enter => "Enter",
            Keycode::Escape => "Esc",
            Keycode::Backspace => "Bksp",
            Keycode::Tab => "Tab",
            Keycode::Space => "Space",
            Keycode::F1 => "F1",
            Keycode::F2 => "F2",
            Keycode::F3 => "F3",
            Keycode::F4 => "F4",
            Keycode::F5 => "F5",
            Keycode::F6 => "F6",
            Keycode::F7 => "F7",
            Keycode::F8 => "F8",
            Keycode::F9 => "F9",
            Keycode::F10 => "F10",
            Keycode::F11 => "F11",
            Keycode::F12 => "F12",
            Keycode::PrintScreen => "PScr",
            Keycode::Pause => "Pause",
            Keycode::Home => "Home",
            Keycode::PageUp => "PgUp",
            Keycode::Delete => "Del",
            Keycode::End => "End",
            Keycode::PageDown => "PgDn",
            Keycode::Right => "Right",
            Keycode::Left => "Left",
            Keycode::Down => "Down",
            Keycode::Up => "Up",
            Keycode::Application => "App",
            Keycode::LCtrl => "LCtrl",
            Keycode::LShift => "LShift",
            Keycode::LAlt => "LAlt",
            Keycode::LGui => "LGui",
            Keycode::RCtrl => "RCtrl",
            Keycode::RShift => "RShift",
            Keycode::RAlt => "RAlt",
            Keycode::RGui => "RGui",
        }
    }
}
