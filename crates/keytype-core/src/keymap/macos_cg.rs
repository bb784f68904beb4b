//! HID Usage ID → macOS `CGKeyCode`.
//!
//! `CGKeyCode` values are ANSI key positions from Carbon's `Events.h`
//! (`kVK_ANSI_*`, `kVK_Return`, ...).  They are positional, so the same code
//! types `q` on QWERTY and `a` on AZERTY.

use super::hid::HidKeyCode;

pub const KVK_RETURN: u16 = 0x24;
pub const KVK_TAB: u16 = 0x30;
pub const KVK_SPACE: u16 = 0x31;
pub const KVK_SHIFT: u16 = 0x38;
pub const KVK_OPTION: u16 = 0x3A;
pub const KVK_CONTROL: u16 = 0x3B;

/// Translates a [`HidKeyCode`] to a macOS `CGKeyCode`.
pub fn hid_to_cgkeycode(hid: HidKeyCode) -> u16 {
    use HidKeyCode::*;
    match hid {
        KeyA => 0x00,
        KeyS => 0x01,
        KeyD => 0x02,
        KeyF => 0x03,
        KeyH => 0x04,
        KeyG => 0x05,
        KeyZ => 0x06,
        KeyX => 0x07,
        KeyC => 0x08,
        KeyV => 0x09,
        KeyB => 0x0B,
        KeyQ => 0x0C,
        KeyW => 0x0D,
        KeyE => 0x0E,
        KeyR => 0x0F,
        KeyY => 0x10,
        KeyT => 0x11,
        KeyO => 0x1F,
        KeyU => 0x20,
        KeyI => 0x22,
        KeyP => 0x23,
        KeyL => 0x25,
        KeyJ => 0x26,
        KeyK => 0x28,
        KeyN => 0x2D,
        KeyM => 0x2E,

        Digit1 => 0x12,
        Digit2 => 0x13,
        Digit3 => 0x14,
        Digit4 => 0x15,
        Digit6 => 0x16,
        Digit5 => 0x17,
        Digit9 => 0x19,
        Digit7 => 0x1A,
        Digit8 => 0x1C,
        Digit0 => 0x1D,

        Enter => KVK_RETURN,
        Tab => KVK_TAB,
        Space => KVK_SPACE,

        Equal => 0x18,
        Minus => 0x1B,
        BracketRight => 0x1E,
        BracketLeft => 0x21,
        Quote => 0x27,
        Semicolon => 0x29,
        Backslash => 0x2A,
        Comma => 0x2B,
        Slash => 0x2C,
        Period => 0x2F,
        Backquote => 0x32,

        ShiftLeft => KVK_SHIFT,
        AltLeft => KVK_OPTION,
        ControlLeft => KVK_CONTROL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::us_ansi;

    #[test]
    fn test_letter_codes_follow_ansi_positions() {
        assert_eq!(hid_to_cgkeycode(HidKeyCode::KeyA), 0x00);
        assert_eq!(hid_to_cgkeycode(HidKeyCode::KeyQ), 0x0C);
        assert_eq!(hid_to_cgkeycode(HidKeyCode::KeyZ), 0x06);
    }

    #[test]
    fn test_whitespace_and_modifier_constants() {
        assert_eq!(hid_to_cgkeycode(HidKeyCode::Enter), 0x24);
        assert_eq!(hid_to_cgkeycode(HidKeyCode::Tab), 0x30);
        assert_eq!(hid_to_cgkeycode(HidKeyCode::Space), 0x31);
        assert_eq!(hid_to_cgkeycode(HidKeyCode::ShiftLeft), 0x38);
        assert_eq!(hid_to_cgkeycode(HidKeyCode::AltLeft), 0x3A);
    }

    #[test]
    fn test_printable_ascii_maps_to_distinct_codes_per_key() {
        let mut by_code = std::collections::HashMap::new();
        for byte in 0x20u8..=0x7E {
            let (hid, _) = us_ansi::lookup(char::from(byte)).unwrap();
            let code = hid_to_cgkeycode(hid);
            let previous = by_code.insert(code, hid);
            assert!(
                previous.is_none() || previous == Some(hid),
                "CGKeyCode 0x{code:02X} shared by {previous:?} and {hid:?}"
            );
        }
    }
}
