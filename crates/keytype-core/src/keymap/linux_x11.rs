//! X11 KeySyms for characters and the keys a typist presses directly.
//!
//! Values come from `X11/keysymdef.h`.  The X server maps a KeySym to a
//! keycode; which shift level the KeySym sits on decides the modifiers.

pub const XK_RETURN: u32 = 0xFF0D;
pub const XK_TAB: u32 = 0xFF09;
pub const XK_SPACE: u32 = 0x0020;
pub const XK_SHIFT_L: u32 = 0xFFE1;
pub const XK_CONTROL_L: u32 = 0xFFE3;
pub const XK_ALT_L: u32 = 0xFFE9;

/// Offset of the KeySym range that encodes Unicode code points directly.
const UNICODE_KEYSYM_BASE: u32 = 0x0100_0000;

/// The KeySym naming `ch` itself, as `XStringToKeysym("U+XXXX")` would.
///
/// Latin-1 printables have legacy KeySyms equal to their code point; every
/// other character uses the Unicode range.  Control characters have none.
pub fn char_to_keysym(ch: char) -> Option<u32> {
    let code = u32::from(ch);
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code),
        0x00..=0x1F | 0x7F..=0x9F => None,
        _ => Some(UNICODE_KEYSYM_BASE | code),
    }
}
