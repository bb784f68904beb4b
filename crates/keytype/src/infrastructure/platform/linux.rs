//! Linux X11 keyboard input via the XTest extension.
//!
//! `XTestFakeKeyEvent` synthesizes a key press or release that the focused
//! window receives exactly like hardware input.  It takes a server keycode,
//! so characters are translated against the server's current keymap:
//!
//! ```text
//! char → KeySym → XKeysymToKeycode → keycode
//!                 XkbKeycodeToKeysym(level 0 / level 1) → none / shift
//! ```
//!
//! Characters the keymap only reaches through other levels (AltGr) are
//! reported as unmapped.
//!
//! The X server tracks modifier state itself, so event flags are not used:
//! pressing the shift keycode before a letter is what makes it uppercase.
//!
//! Requires `DISPLAY` to name a reachable X server; [`X11Input::open`]
//! fails otherwise.

#![cfg(target_os = "linux")]

use std::os::raw::c_char;
use std::ptr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use keytype_core::keymap::linux_x11::{
    char_to_keysym, XK_ALT_L, XK_CONTROL_L, XK_RETURN, XK_SHIFT_L, XK_SPACE, XK_TAB,
};
use keytype_core::{
    FixedKey, KeyDirection, KeyId, KeyTranslator, LayoutHandle, ModifierDescriptor, ModifierMask,
    UnmappedCharacter,
};
use tracing::{debug, trace};
use x11::xlib;
use x11::xtest;

use crate::application::platform::{InputError, PlatformInput};

/// `CurrentTime`: deliver the fake event immediately.
const CURRENT_TIME: u64 = 0;

/// Owned Xlib connection.
struct Connection(*mut xlib::Display);

// SAFETY: the pointer is only dereferenced by Xlib while the owning
// `Mutex` is locked, so calls never overlap.
unsafe impl Send for Connection {}

impl Drop for Connection {
    fn drop(&mut self) {
        // SAFETY: the pointer came from XOpenDisplay and is closed once.
        unsafe {
            xlib::XCloseDisplay(self.0);
        }
    }
}

/// X11/XTest implementation of [`PlatformInput`].
pub struct X11Input {
    display: Mutex<Connection>,
    fixed: [KeyId; 3],
    modifiers: Vec<ModifierDescriptor>,
}

impl X11Input {
    /// Connects to the display named by `DISPLAY`.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::Unavailable`] if the display cannot be opened.
    pub fn open() -> Result<Self, InputError> {
        // SAFETY: a null name means "use $DISPLAY".
        let display = unsafe { xlib::XOpenDisplay(ptr::null::<c_char>()) };
        if display.is_null() {
            return Err(InputError::Unavailable("cannot open X display".to_string()));
        }
        let connection = Connection(display);

        let keycode = |keysym: u32| KeyId(u16::from(keysym_to_keycode(&connection, keysym)));
        let fixed = [keycode(XK_RETURN), keycode(XK_TAB), keycode(XK_SPACE)];
        let modifiers = [
            (ModifierMask::SHIFT, XK_SHIFT_L),
            (ModifierMask::CONTROL, XK_CONTROL_L),
            (ModifierMask::ALT, XK_ALT_L),
        ]
        .into_iter()
        .filter_map(|(mask, keysym)| {
            let key = keycode(keysym);
            (key.0 != 0).then_some(ModifierDescriptor {
                mask,
                state_key: key,
                event_key: key,
            })
        })
        .collect::<Vec<_>>();
        debug!(modifiers = modifiers.len(), "X display opened");

        Ok(Self {
            display: Mutex::new(connection),
            fixed,
            modifiers,
        })
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        self.display.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn keysym_to_keycode(connection: &Connection, keysym: u32) -> u8 {
    // SAFETY: the display pointer is valid for the connection's lifetime.
    unsafe { xlib::XKeysymToKeycode(connection.0, xlib::KeySym::from(keysym)) }
}

impl KeyTranslator for X11Input {
    fn fixed_key(&self, key: FixedKey) -> KeyId {
        match key {
            FixedKey::Return => self.fixed[0],
            FixedKey::Tab => self.fixed[1],
            FixedKey::Space => self.fixed[2],
        }
    }

    fn translate_char(
        &self,
        ch: char,
        _layout: LayoutHandle,
    ) -> Result<(KeyId, ModifierMask), UnmappedCharacter> {
        let connection = self.connection();
        let keysym = char_to_keysym(ch).ok_or(UnmappedCharacter { ch })?;
        let keycode = keysym_to_keycode(&connection, keysym);
        if keycode == 0 {
            return Err(UnmappedCharacter { ch });
        }
        let mods = level_of(keysym, |level| keycode_to_keysym(&connection, keycode, level))
            .ok_or(UnmappedCharacter { ch })?;
        Ok((KeyId(u16::from(keycode)), mods))
    }
}

fn keycode_to_keysym(connection: &Connection, keycode: u8, level: u32) -> u32 {
    // SAFETY: the display pointer is valid for the connection's lifetime;
    // out-of-range levels return NoSymbol.
    let keysym = unsafe { xlib::XkbKeycodeToKeysym(connection.0, keycode, 0, level as _) };
    keysym as u32
}

/// The modifiers selecting the shift level at which `keysym` sits, given
/// the keysym `at` each level of its key in group 0.
fn level_of(keysym: u32, at: impl Fn(u32) -> u32) -> Option<ModifierMask> {
    if at(0) == keysym {
        Some(ModifierMask::empty())
    } else if at(1) == keysym {
        Some(ModifierMask::SHIFT)
    } else {
        None
    }
}

impl PlatformInput for X11Input {
    fn name(&self) -> &'static str {
        "x11"
    }

    fn modifiers(&self) -> &[ModifierDescriptor] {
        &self.modifiers
    }

    fn inject_key_event(
        &self,
        key: KeyId,
        direction: KeyDirection,
        _flags: ModifierMask,
    ) -> Result<(), InputError> {
        if key.is_none() || key.0 == 0 || key.0 > 255 {
            return Err(InputError::InvalidKey(key));
        }
        let is_press = i32::from(direction == KeyDirection::Down);
        let connection = self.connection();
        // SAFETY: the display is valid and access is serialized by the lock.
        let sent = unsafe {
            let sent = xtest::XTestFakeKeyEvent(connection.0, u32::from(key.0), is_press, CURRENT_TIME);
            xlib::XFlush(connection.0);
            sent
        };
        trace!(%key, ?direction, "XTestFakeKeyEvent");
        if sent == 0 {
            Err(InputError::native("XTestFakeKeyEvent", "request rejected"))
        } else {
            Ok(())
        }
    }

    fn key_is_down(&self, key: KeyId) -> bool {
        if key.0 > 255 {
            return false;
        }
        let mut keymap: [c_char; 32] = [0; 32];
        let connection = self.connection();
        // SAFETY: XQueryKeymap writes exactly 32 bytes into the buffer.
        unsafe {
            xlib::XQueryKeymap(connection.0, keymap.as_mut_ptr());
        }
        keymap_bit(&keymap, key.0 as u8)
    }
}

/// Whether `keycode` is set in an `XQueryKeymap` bit vector.
fn keymap_bit(keymap: &[c_char; 32], keycode: u8) -> bool {
    let byte = keymap[usize::from(keycode / 8)] as u8;
    byte & (1 << (keycode % 8)) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keymap_bit_reads_little_endian_bit_vector() {
        // Arrange: keycode 50 (byte 6, bit 2) down
        let mut keymap: [c_char; 32] = [0; 32];
        keymap[6] = 0b0000_0100;

        // Act / Assert
        assert!(keymap_bit(&keymap, 50));
        assert!(!keymap_bit(&keymap, 49));
        assert!(!keymap_bit(&keymap, 51));
    }

    #[test]
    fn test_level_of_maps_first_two_levels() {
        // Arrange: a key with 'q', 'Q' and '@' on levels 0, 1 and 2
        let key = |level: u32| match level {
            0 => 0x71,
            1 => 0x51,
            2 => 0x40,
            _ => 0,
        };

        // Act / Assert
        assert_eq!(level_of(0x71, key), Some(ModifierMask::empty()));
        assert_eq!(level_of(0x51, key), Some(ModifierMask::SHIFT));
        assert_eq!(level_of(0x40, key), None);
    }

    #[test]
    fn test_keymap_bit_high_keycode() {
        let mut keymap: [c_char; 32] = [0; 32];
        keymap[31] = 0x80u8 as c_char;
        assert!(keymap_bit(&keymap, 255));
    }
}
