//! Static US-ANSI layout: character → (key position, modifiers).
//!
//! Used when the platform cannot ask the live keyboard layout (macOS and X11
//! in this crate, and the recording platform in tests).  Covers printable
//! ASCII plus newline, tab and space; anything else is unmapped.

use super::{HidKeyCode, ModifierMask};

/// Looks up the key position and modifiers that produce `ch` on a US-ANSI
/// keyboard.
///
/// Returns `None` for characters the layout cannot type.
pub fn lookup(ch: char) -> Option<(HidKeyCode, ModifierMask)> {
    if ch.is_ascii_lowercase() {
        return letter(ch).map(|hid| (hid, ModifierMask::empty()));
    }
    if ch.is_ascii_uppercase() {
        return letter(ch.to_ascii_lowercase()).map(|hid| (hid, ModifierMask::SHIFT));
    }

    let plain = ModifierMask::empty();
    let shift = ModifierMask::SHIFT;
    use HidKeyCode::*;
    let entry = match ch {
        '\n' => (Enter, plain),
        '\t' => (Tab, plain),
        ' ' => (Space, plain),

        '1' => (Digit1, plain),
        '2' => (Digit2, plain),
        '3' => (Digit3, plain),
        '4' => (Digit4, plain),
        '5' => (Digit5, plain),
        '6' => (Digit6, plain),
        '7' => (Digit7, plain),
        '8' => (Digit8, plain),
        '9' => (Digit9, plain),
        '0' => (Digit0, plain),
        '!' => (Digit1, shift),
        '@' => (Digit2, shift),
        '#' => (Digit3, shift),
        '$' => (Digit4, shift),
        '%' => (Digit5, shift),
        '^' => (Digit6, shift),
        '&' => (Digit7, shift),
        '*' => (Digit8, shift),
        '(' => (Digit9, shift),
        ')' => (Digit0, shift),

        '-' => (Minus, plain),
        '_' => (Minus, shift),
        '=' => (Equal, plain),
        '+' => (Equal, shift),
        '[' => (BracketLeft, plain),
        '{' => (BracketLeft, shift),
        ']' => (BracketRight, plain),
        '}' => (BracketRight, shift),
        '\\' => (Backslash, plain),
        '|' => (Backslash, shift),
        ';' => (Semicolon, plain),
        ':' => (Semicolon, shift),
        '\'' => (Quote, plain),
        '"' => (Quote, shift),
        '`' => (Backquote, plain),
        '~' => (Backquote, shift),
        ',' => (Comma, plain),
        '<' => (Comma, shift),
        '.' => (Period, plain),
        '>' => (Period, shift),
        '/' => (Slash, plain),
        '?' => (Slash, shift),
        _ => return None,
    };
    Some(entry)
}

fn letter(lower: char) -> Option<HidKeyCode> {
    use HidKeyCode::*;
    const LETTERS: [HidKeyCode; 26] = [
        KeyA, KeyB, KeyC, KeyD, KeyE, KeyF, KeyG, KeyH, KeyI, KeyJ, KeyK, KeyL, KeyM, KeyN,
        KeyO, KeyP, KeyQ, KeyR, KeyS, KeyT, KeyU, KeyV, KeyW, KeyX, KeyY, KeyZ,
    ];
    let offset = u32::from(lower).checked_sub(u32::from('a'))?;
    LETTERS.get(usize::try_from(offset).ok()?).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_printable_ascii_character_is_mapped() {
        for byte in 0x20u8..=0x7E {
            let ch = char::from(byte);
            assert!(lookup(ch).is_some(), "{ch:?} must be typeable on US-ANSI");
        }
    }

    #[test]
    fn test_lowercase_and_uppercase_share_a_key() {
        let (lower, lower_mods) = lookup('k').unwrap();
        let (upper, upper_mods) = lookup('K').unwrap();
        assert_eq!(lower, HidKeyCode::KeyK);
        assert_eq!(upper, HidKeyCode::KeyK);
        assert!(lower_mods.is_empty());
        assert_eq!(upper_mods, ModifierMask::SHIFT);
    }

    #[test]
    fn test_shifted_symbols() {
        assert_eq!(lookup('!'), Some((HidKeyCode::Digit1, ModifierMask::SHIFT)));
        assert_eq!(lookup(':'), Some((HidKeyCode::Semicolon, ModifierMask::SHIFT)));
        assert_eq!(lookup('?'), Some((HidKeyCode::Slash, ModifierMask::SHIFT)));
        assert_eq!(lookup('/'), Some((HidKeyCode::Slash, ModifierMask::empty())));
    }

    #[test]
    fn test_non_ascii_is_unmapped() {
        for ch in ['†', '→', 'é', '\u{1F600}', '\r', '\u{7F}'] {
            assert_eq!(lookup(ch), None, "{ch:?} must be unmapped");
        }
    }
}
