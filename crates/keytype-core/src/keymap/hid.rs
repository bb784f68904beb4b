//! USB HID Usage IDs (page 0x07, Keyboard/Keypad) for the keys that typing
//! text can touch.
//!
//! HID codes identify **physical key positions**, not characters, which makes
//! them a convenient pivot between the static US-ANSI character table and the
//! per-platform native code tables.  Only the main typing block and the
//! modifier keys are listed; navigation, function and numpad keys never come
//! out of text.
//!
//! Reference: USB HID Usage Tables 1.3, Section 10.

/// USB HID Usage ID for a typing-block or modifier key.
///
/// The numeric value of each variant is its HID Usage ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum HidKeyCode {
    // Letters (HID 0x04–0x1D)
    KeyA = 0x04,
    KeyB = 0x05,
    KeyC = 0x06,
    KeyD = 0x07,
    KeyE = 0x08,
    KeyF = 0x09,
    KeyG = 0x0A,
    KeyH = 0x0B,
    KeyI = 0x0C,
    KeyJ = 0x0D,
    KeyK = 0x0E,
    KeyL = 0x0F,
    KeyM = 0x10,
    KeyN = 0x11,
    KeyO = 0x12,
    KeyP = 0x13,
    KeyQ = 0x14,
    KeyR = 0x15,
    KeyS = 0x16,
    KeyT = 0x17,
    KeyU = 0x18,
    KeyV = 0x19,
    KeyW = 0x1A,
    KeyX = 0x1B,
    KeyY = 0x1C,
    KeyZ = 0x1D,

    // Digit row (HID 0x1E–0x27)
    Digit1 = 0x1E,
    Digit2 = 0x1F,
    Digit3 = 0x20,
    Digit4 = 0x21,
    Digit5 = 0x22,
    Digit6 = 0x23,
    Digit7 = 0x24,
    Digit8 = 0x25,
    Digit9 = 0x26,
    Digit0 = 0x27,

    // Whitespace and punctuation (HID 0x28–0x38)
    Enter = 0x28,
    Tab = 0x2B,
    Space = 0x2C,
    Minus = 0x2D,
    Equal = 0x2E,
    BracketLeft = 0x2F,
    BracketRight = 0x30,
    Backslash = 0x31,
    Semicolon = 0x33,
    Quote = 0x34,
    Backquote = 0x35,
    Comma = 0x36,
    Period = 0x37,
    Slash = 0x38,

    // Left-hand modifiers (HID 0xE0–0xE2)
    ControlLeft = 0xE0,
    ShiftLeft = 0xE1,
    AltLeft = 0xE2,
}

impl HidKeyCode {
    /// Returns the raw USB HID Usage ID value for this key code.
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_u16_returns_usage_id() {
        assert_eq!(HidKeyCode::KeyA.as_u16(), 0x04);
        assert_eq!(HidKeyCode::Digit0.as_u16(), 0x27);
        assert_eq!(HidKeyCode::Space.as_u16(), 0x2C);
        assert_eq!(HidKeyCode::ShiftLeft.as_u16(), 0xE1);
    }
}
