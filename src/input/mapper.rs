//! Scancode Mapping Tables
//!
//! PicoCalc keyboard-controller scancode to Linux evdev keycode mapping.
//!
//! The controller reports printable keys as their ASCII value (already
//! shifted, e.g. `'A'` or `'!'`) and everything else from a vendor range
//! starting at 0x81. Shifted characters map to the unshifted evdev key; the
//! shift state reaches the host through the separately reported shift keys.

/// Linux evdev keycodes
pub mod keycodes {
    pub const KEY_RESERVED: u16 = 0;
    pub const KEY_ESC: u16 = 1;
    pub const KEY_1: u16 = 2;
    pub const KEY_2: u16 = 3;
    pub const KEY_3: u16 = 4;
    pub const KEY_4: u16 = 5;
    pub const KEY_5: u16 = 6;
    pub const KEY_6: u16 = 7;
    pub const KEY_7: u16 = 8;
    pub const KEY_8: u16 = 9;
    pub const KEY_9: u16 = 10;
    pub const KEY_0: u16 = 11;
    pub const KEY_MINUS: u16 = 12;
    pub const KEY_EQUAL: u16 = 13;
    pub const KEY_BACKSPACE: u16 = 14;
    pub const KEY_TAB: u16 = 15;
    pub const KEY_Q: u16 = 16;
    pub const KEY_W: u16 = 17;
    pub const KEY_E: u16 = 18;
    pub const KEY_R: u16 = 19;
    pub const KEY_T: u16 = 20;
    pub const KEY_Y: u16 = 21;
    pub const KEY_U: u16 = 22;
    pub const KEY_I: u16 = 23;
    pub const KEY_O: u16 = 24;
    pub const KEY_P: u16 = 25;
    pub const KEY_LEFTBRACE: u16 = 26;
    pub const KEY_RIGHTBRACE: u16 = 27;
    pub const KEY_ENTER: u16 = 28;
    pub const KEY_LEFTCTRL: u16 = 29;
    pub const KEY_A: u16 = 30;
    pub const KEY_S: u16 = 31;
    pub const KEY_D: u16 = 32;
    pub const KEY_F: u16 = 33;
    pub const KEY_G: u16 = 34;
    pub const KEY_H: u16 = 35;
    pub const KEY_J: u16 = 36;
    pub const KEY_K: u16 = 37;
    pub const KEY_L: u16 = 38;
    pub const KEY_SEMICOLON: u16 = 39;
    pub const KEY_APOSTROPHE: u16 = 40;
    pub const KEY_GRAVE: u16 = 41;
    pub const KEY_LEFTSHIFT: u16 = 42;
    pub const KEY_BACKSLASH: u16 = 43;
    pub const KEY_Z: u16 = 44;
    pub const KEY_X: u16 = 45;
    pub const KEY_C: u16 = 46;
    pub const KEY_V: u16 = 47;
    pub const KEY_B: u16 = 48;
    pub const KEY_N: u16 = 49;
    pub const KEY_M: u16 = 50;
    pub const KEY_COMMA: u16 = 51;
    pub const KEY_DOT: u16 = 52;
    pub const KEY_SLASH: u16 = 53;
    pub const KEY_RIGHTSHIFT: u16 = 54;
    pub const KEY_LEFTALT: u16 = 56;
    pub const KEY_SPACE: u16 = 57;
    pub const KEY_CAPSLOCK: u16 = 58;

    // Function keys
    pub const KEY_F1: u16 = 59;
    pub const KEY_F2: u16 = 60;
    pub const KEY_F3: u16 = 61;
    pub const KEY_F4: u16 = 62;
    pub const KEY_F5: u16 = 63;
    pub const KEY_F6: u16 = 64;
    pub const KEY_F7: u16 = 65;
    pub const KEY_F8: u16 = 66;
    pub const KEY_F9: u16 = 67;
    pub const KEY_F10: u16 = 68;

    // Navigation
    pub const KEY_HOME: u16 = 102;
    pub const KEY_UP: u16 = 103;
    pub const KEY_PAGEUP: u16 = 104;
    pub const KEY_LEFT: u16 = 105;
    pub const KEY_RIGHT: u16 = 106;
    pub const KEY_END: u16 = 107;
    pub const KEY_DOWN: u16 = 108;
    pub const KEY_PAGEDOWN: u16 = 109;
    pub const KEY_INSERT: u16 = 110;
    pub const KEY_DELETE: u16 = 111;
    pub const KEY_PAUSE: u16 = 119;

    pub const KEY_UNKNOWN: u16 = 240;

    // Pointer buttons
    pub const BTN_LEFT: u16 = 0x110;
    pub const BTN_RIGHT: u16 = 0x111;
}

/// PicoCalc keyboard-controller scancodes
pub mod scancodes {
    pub const SC_BACKSPACE: u8 = 0x08;
    pub const SC_TAB: u8 = 0x09;
    pub const SC_ENTER: u8 = 0x0A;
    pub const SC_SPACE: u8 = b' ';
    pub const SC_LEFTBRACE: u8 = b'[';
    pub const SC_RIGHTBRACE: u8 = b']';

    pub const SC_F1: u8 = 0x81;
    pub const SC_F10: u8 = 0x8A;

    pub const SC_ALT: u8 = 0xA1;
    pub const SC_LEFTSHIFT: u8 = 0xA2;
    pub const SC_RIGHTSHIFT: u8 = 0xA3;
    pub const SC_SYM: u8 = 0xA4;
    pub const SC_CTRL: u8 = 0xA5;

    pub const SC_ESC: u8 = 0xB1;
    pub const SC_LEFT: u8 = 0xB4;
    pub const SC_UP: u8 = 0xB5;
    pub const SC_DOWN: u8 = 0xB6;
    pub const SC_RIGHT: u8 = 0xB7;

    pub const SC_CAPSLOCK: u8 = 0xC1;

    pub const SC_BREAK: u8 = 0xD0;
    pub const SC_INSERT: u8 = 0xD1;
    pub const SC_HOME: u8 = 0xD2;
    pub const SC_DELETE: u8 = 0xD4;
    pub const SC_END: u8 = 0xD5;
    pub const SC_PAGEUP: u8 = 0xD6;
    pub const SC_PAGEDOWN: u8 = 0xD7;
}

use keycodes::*;
use scancodes::*;

/// Result of a scancode table lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyMapping {
    /// Scancode is deliberately dropped without comment
    Ignored,
    /// Scancode has no mapping; peripheral and table are out of sync
    Unknown,
    /// Scancode maps to this evdev keycode
    Key(u16),
}

impl KeyMapping {
    /// Keycode for mapped entries
    pub fn keycode(self) -> Option<u16> {
        match self {
            KeyMapping::Key(code) => Some(code),
            KeyMapping::Ignored | KeyMapping::Unknown => None,
        }
    }
}

/// Number of addressable scancodes
pub const NUM_SCANCODES: usize = 256;

const fn key(scancode: u8, code: u16) -> (u8, KeyMapping) {
    (scancode, KeyMapping::Key(code))
}

/// Default PicoCalc layout
const PICOCALC_MAPPINGS: &[(u8, KeyMapping)] = &[
    (0x00, KeyMapping::Ignored),
    key(SC_BACKSPACE, KEY_BACKSPACE),
    key(SC_TAB, KEY_TAB),
    key(SC_ENTER, KEY_ENTER),
    key(SC_SPACE, KEY_SPACE),
    // Digits and their shifted symbols
    key(b'1', KEY_1),
    key(b'2', KEY_2),
    key(b'3', KEY_3),
    key(b'4', KEY_4),
    key(b'5', KEY_5),
    key(b'6', KEY_6),
    key(b'7', KEY_7),
    key(b'8', KEY_8),
    key(b'9', KEY_9),
    key(b'0', KEY_0),
    key(b'!', KEY_1),
    key(b'@', KEY_2),
    key(b'#', KEY_3),
    key(b'$', KEY_4),
    key(b'%', KEY_5),
    key(b'^', KEY_6),
    key(b'&', KEY_7),
    key(b'*', KEY_8),
    key(b'(', KEY_9),
    key(b')', KEY_0),
    // Punctuation
    key(b'-', KEY_MINUS),
    key(b'_', KEY_MINUS),
    key(b'=', KEY_EQUAL),
    key(b'+', KEY_EQUAL),
    key(SC_LEFTBRACE, KEY_LEFTBRACE),
    key(b'{', KEY_LEFTBRACE),
    key(SC_RIGHTBRACE, KEY_RIGHTBRACE),
    key(b'}', KEY_RIGHTBRACE),
    key(b';', KEY_SEMICOLON),
    key(b':', KEY_SEMICOLON),
    key(b'\'', KEY_APOSTROPHE),
    key(b'"', KEY_APOSTROPHE),
    key(b'`', KEY_GRAVE),
    key(b'~', KEY_GRAVE),
    key(b'\\', KEY_BACKSLASH),
    key(b'|', KEY_BACKSLASH),
    key(b',', KEY_COMMA),
    key(b'<', KEY_COMMA),
    key(b'.', KEY_DOT),
    key(b'>', KEY_DOT),
    key(b'/', KEY_SLASH),
    key(b'?', KEY_SLASH),
    // Letters, both cases
    key(b'a', KEY_A),
    key(b'b', KEY_B),
    key(b'c', KEY_C),
    key(b'd', KEY_D),
    key(b'e', KEY_E),
    key(b'f', KEY_F),
    key(b'g', KEY_G),
    key(b'h', KEY_H),
    key(b'i', KEY_I),
    key(b'j', KEY_J),
    key(b'k', KEY_K),
    key(b'l', KEY_L),
    key(b'm', KEY_M),
    key(b'n', KEY_N),
    key(b'o', KEY_O),
    key(b'p', KEY_P),
    key(b'q', KEY_Q),
    key(b'r', KEY_R),
    key(b's', KEY_S),
    key(b't', KEY_T),
    key(b'u', KEY_U),
    key(b'v', KEY_V),
    key(b'w', KEY_W),
    key(b'x', KEY_X),
    key(b'y', KEY_Y),
    key(b'z', KEY_Z),
    key(b'A', KEY_A),
    key(b'B', KEY_B),
    key(b'C', KEY_C),
    key(b'D', KEY_D),
    key(b'E', KEY_E),
    key(b'F', KEY_F),
    key(b'G', KEY_G),
    key(b'H', KEY_H),
    key(b'I', KEY_I),
    key(b'J', KEY_J),
    key(b'K', KEY_K),
    key(b'L', KEY_L),
    key(b'M', KEY_M),
    key(b'N', KEY_N),
    key(b'O', KEY_O),
    key(b'P', KEY_P),
    key(b'Q', KEY_Q),
    key(b'R', KEY_R),
    key(b'S', KEY_S),
    key(b'T', KEY_T),
    key(b'U', KEY_U),
    key(b'V', KEY_V),
    key(b'W', KEY_W),
    key(b'X', KEY_X),
    key(b'Y', KEY_Y),
    key(b'Z', KEY_Z),
    // Function keys
    key(SC_F1, KEY_F1),
    key(0x82, KEY_F2),
    key(0x83, KEY_F3),
    key(0x84, KEY_F4),
    key(0x85, KEY_F5),
    key(0x86, KEY_F6),
    key(0x87, KEY_F7),
    key(0x88, KEY_F8),
    key(0x89, KEY_F9),
    key(SC_F10, KEY_F10),
    // Modifiers
    key(SC_ALT, KEY_LEFTALT),
    key(SC_LEFTSHIFT, KEY_LEFTSHIFT),
    key(SC_RIGHTSHIFT, KEY_RIGHTSHIFT),
    (SC_SYM, KeyMapping::Ignored),
    key(SC_CTRL, KEY_LEFTCTRL),
    key(SC_CAPSLOCK, KEY_CAPSLOCK),
    // Navigation
    key(SC_ESC, KEY_ESC),
    key(SC_LEFT, KEY_LEFT),
    key(SC_UP, KEY_UP),
    key(SC_DOWN, KEY_DOWN),
    key(SC_RIGHT, KEY_RIGHT),
    key(SC_BREAK, KEY_PAUSE),
    key(SC_INSERT, KEY_INSERT),
    key(SC_HOME, KEY_HOME),
    key(SC_DELETE, KEY_DELETE),
    key(SC_END, KEY_END),
    key(SC_PAGEUP, KEY_PAGEUP),
    key(SC_PAGEDOWN, KEY_PAGEDOWN),
];

/// Fixed lookup table from controller scancode to evdev keycode
///
/// Every index holds an explicit entry; scancodes absent from the source
/// mapping list are [`KeyMapping::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScancodeTable {
    entries: [KeyMapping; NUM_SCANCODES],
}

/// The built-in PicoCalc table
pub static PICOCALC_TABLE: ScancodeTable = ScancodeTable::from_mappings(PICOCALC_MAPPINGS);

impl ScancodeTable {
    /// Build a table from `(scancode, mapping)` pairs; later pairs win
    pub const fn from_mappings(mappings: &[(u8, KeyMapping)]) -> Self {
        let mut entries = [KeyMapping::Unknown; NUM_SCANCODES];
        let mut i = 0;
        while i < mappings.len() {
            let (scancode, mapping) = mappings[i];
            entries[scancode as usize] = mapping;
            i += 1;
        }
        Self { entries }
    }

    /// The built-in PicoCalc table
    pub fn picocalc() -> &'static Self {
        &PICOCALC_TABLE
    }

    /// Look up a scancode
    pub fn lookup(&self, scancode: u8) -> KeyMapping {
        // u8 always indexes within the 256-entry table
        self.entries[scancode as usize]
    }

    /// Every distinct keycode the table can produce, in ascending order
    pub fn keycodes(&self) -> Vec<u16> {
        let mut codes: Vec<u16> = self
            .entries
            .iter()
            .filter_map(|mapping| mapping.keycode())
            .collect();
        codes.sort_unstable();
        codes.dedup();
        codes
    }

    /// Number of scancodes with a keycode mapping
    pub fn mapped_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|mapping| matches!(mapping, KeyMapping::Key(_)))
            .count()
    }
}

impl Default for ScancodeTable {
    fn default() -> Self {
        PICOCALC_TABLE.clone()
    }
}
