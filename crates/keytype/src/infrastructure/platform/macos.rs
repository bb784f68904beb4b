//! macOS keyboard input via CoreGraphics events.
//!
//! Each key event is a `CGEvent` created from a HID-system-state event
//! source and posted at the HID tap, the same level as hardware input.
//!
//! Characters are translated against the active keyboard input source: its
//! `uchr` layout data is searched with `UCKeyTranslate` for the virtual key
//! and shift/option combination that produces the character.  Input sources
//! without `uchr` data (some IMEs) fall back to the static US-ANSI table.
//!
//! Every event carries the flags of the modifiers the session holds, so an
//! application reading flags rather than key state still sees shift.  For
//! the same reason a failed modifier press stops the session: the next key
//! would arrive with flags that do not match what is physically down.
//!
//! # Accessibility permission
//!
//! Posting at the HID tap requires the Accessibility permission (System
//! Settings → Privacy & Security → Accessibility).  Without it the events are
//! silently dropped.

#![cfg(target_os = "macos")]

use std::ffi::c_void;
use std::ptr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation, CGKeyCode};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use keytype_core::keymap::macos_cg::{
    hid_to_cgkeycode, KVK_OPTION, KVK_RETURN, KVK_SHIFT, KVK_SPACE, KVK_TAB,
};
use keytype_core::keymap::us_ansi;
use keytype_core::{
    FixedKey, KeyDirection, KeyId, KeyTranslator, LayoutHandle, ModifierDescriptor, ModifierMask,
    UnmappedCharacter,
};
use tracing::{debug, trace};

use crate::application::platform::{InputError, ModifierFailurePolicy, PlatformInput, QueueId};

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventSourceKeyState(state_id: CGEventSourceStateID, key: CGKeyCode) -> bool;
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFDataGetBytePtr(data: *const c_void) -> *const u8;
    fn CFRelease(cf: *const c_void);
}

#[link(name = "Carbon", kind = "framework")]
extern "C" {
    static kTISPropertyUnicodeKeyLayoutData: *const c_void;
    fn TISCopyCurrentKeyboardLayoutInputSource() -> *const c_void;
    fn TISGetInputSourceProperty(source: *const c_void, key: *const c_void) -> *const c_void;
    fn LMGetKbdType() -> u8;
    #[allow(clippy::too_many_arguments)]
    fn UCKeyTranslate(
        layout: *const u8,
        virtual_key_code: u16,
        key_action: u16,
        modifier_key_state: u32,
        keyboard_type: u32,
        key_translate_options: u32,
        dead_key_state: *mut u32,
        max_string_length: usize,
        actual_string_length: *mut usize,
        unicode_string: *mut u16,
    ) -> i32;
}

const UC_KEY_ACTION_DOWN: u16 = 0;
const UC_KEY_TRANSLATE_NO_DEAD_KEYS_MASK: u32 = 1;

/// `UCKeyTranslate` modifier states tried for each key, fewest modifiers
/// first.  The values are Carbon modifier bits shifted right by 8.
const LAYOUT_STATES: [(u32, ModifierMask); 4] = [
    (0x00, ModifierMask::empty()),
    (0x02, ModifierMask::SHIFT),
    (0x08, ModifierMask::ALT),
    (0x0A, ModifierMask::from_bits_truncate(0x05)),
];

/// Virtual key codes covered by `uchr` layouts.
const VIRTUAL_KEYS: u16 = 128;

const MODIFIERS: [ModifierDescriptor; 2] = [
    ModifierDescriptor {
        mask: ModifierMask::SHIFT,
        state_key: KeyId(KVK_SHIFT),
        event_key: KeyId(KVK_SHIFT),
    },
    ModifierDescriptor {
        mask: ModifierMask::ALT,
        state_key: KeyId(KVK_OPTION),
        event_key: KeyId(KVK_OPTION),
    },
];

/// A retained keyboard input source and its `uchr` layout data.
struct InputSource {
    source: *const c_void,
    layout: *const u8,
    keyboard_type: u32,
}

// SAFETY: the source is retained until drop and its layout data is
// read-only; access goes through the owning `Mutex`.
unsafe impl Send for InputSource {}

impl InputSource {
    /// The keyboard layout currently selected by the user, if it carries
    /// `uchr` data.
    fn current() -> Option<Self> {
        // SAFETY: the copy is released in `drop` (or below on failure); the
        // property and its bytes live as long as the source.
        unsafe {
            let source = TISCopyCurrentKeyboardLayoutInputSource();
            if source.is_null() {
                return None;
            }
            let data = TISGetInputSourceProperty(source, kTISPropertyUnicodeKeyLayoutData);
            let layout = if data.is_null() {
                ptr::null()
            } else {
                CFDataGetBytePtr(data)
            };
            if layout.is_null() {
                CFRelease(source);
                return None;
            }
            Some(Self {
                source,
                layout,
                keyboard_type: u32::from(LMGetKbdType()),
            })
        }
    }

    /// First UTF-16 unit produced by `key` under `state`, if any.
    fn produce(&self, key: u16, state: u32) -> Option<u16> {
        let mut dead_key_state = 0u32;
        let mut chars = [0u16; 4];
        let mut len = 0usize;
        // SAFETY: the layout pointer is valid while `self` holds the source
        // and the output buffer length is passed alongside it.
        let status = unsafe {
            UCKeyTranslate(
                self.layout,
                key,
                UC_KEY_ACTION_DOWN,
                state,
                self.keyboard_type,
                UC_KEY_TRANSLATE_NO_DEAD_KEYS_MASK,
                &mut dead_key_state,
                chars.len(),
                &mut len,
                chars.as_mut_ptr(),
            )
        };
        (status == 0 && len > 0).then_some(chars[0])
    }
}

impl Drop for InputSource {
    fn drop(&mut self) {
        // SAFETY: `source` came from a TIS copy function and is released once.
        unsafe { CFRelease(self.source) }
    }
}

/// Finds the key and modifiers that make `produce` yield `ch`, preferring
/// fewer modifiers, then lower key codes.
fn search_layout(
    ch: char,
    produce: impl Fn(u16, u32) -> Option<u16>,
) -> Option<(KeyId, ModifierMask)> {
    let mut unit = [0u16; 2];
    let [wanted] = ch.encode_utf16(&mut unit) else {
        return None;
    };
    let wanted = *wanted;
    LAYOUT_STATES.iter().find_map(|&(state, mods)| {
        (0..VIRTUAL_KEYS)
            .find(|&key| produce(key, state) == Some(wanted))
            .map(|key| (KeyId(key), mods))
    })
}

/// macOS implementation of [`PlatformInput`].
#[derive(Default)]
pub struct MacosInput {
    source: Mutex<Option<InputSource>>,
}

impl MacosInput {
    pub fn new() -> Self {
        Self::default()
    }

    fn source(&self) -> MutexGuard<'_, Option<InputSource>> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyTranslator for MacosInput {
    fn fixed_key(&self, key: FixedKey) -> KeyId {
        KeyId(match key {
            FixedKey::Return => KVK_RETURN,
            FixedKey::Tab => KVK_TAB,
            FixedKey::Space => KVK_SPACE,
        })
    }

    fn translate_char(
        &self,
        ch: char,
        _layout: LayoutHandle,
    ) -> Result<(KeyId, ModifierMask), UnmappedCharacter> {
        let mut source = self.source();
        if source.is_none() {
            *source = InputSource::current();
        }
        match source.as_ref() {
            Some(live) => search_layout(ch, |key, state| live.produce(key, state)),
            None => us_ansi::lookup(ch).map(|(hid, mods)| (KeyId(hid_to_cgkeycode(hid)), mods)),
        }
        .ok_or(UnmappedCharacter { ch })
    }
}

impl PlatformInput for MacosInput {
    fn name(&self) -> &'static str {
        "macos"
    }

    fn modifiers(&self) -> &[ModifierDescriptor] {
        &MODIFIERS
    }

    /// Snapshots the active input source for the session about to start.
    fn keyboard_layout(&self, _owner: Option<QueueId>) -> LayoutHandle {
        let live = InputSource::current();
        let handle = live
            .as_ref()
            .map_or(LayoutHandle::DEFAULT, |live| LayoutHandle(live.source as usize));
        debug!(live = live.is_some(), "keyboard input source selected");
        *self.source() = live;
        handle
    }

    fn inject_key_event(
        &self,
        key: KeyId,
        direction: KeyDirection,
        flags: ModifierMask,
    ) -> Result<(), InputError> {
        if key.is_none() {
            return Err(InputError::InvalidKey(key));
        }
        // CGEventSource is not Send; one is created per event.
        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|()| InputError::native("CGEventSourceCreate", "no event source"))?;
        let event = CGEvent::new_keyboard_event(source, key.0, direction == KeyDirection::Down)
            .map_err(|()| InputError::native("CGEventCreateKeyboardEvent", "no event"))?;
        event.set_flags(event_flags(flags));
        event.post(CGEventTapLocation::HID);
        trace!(%key, ?direction, %flags, "CGEventPost");
        Ok(())
    }

    fn key_is_down(&self, key: KeyId) -> bool {
        // SAFETY: CGEventSourceKeyState only reads global keyboard state.
        unsafe { CGEventSourceKeyState(CGEventSourceStateID::HIDSystemState, key.0) }
    }

    fn modifier_failure_policy(&self) -> ModifierFailurePolicy {
        ModifierFailurePolicy::Abort
    }
}

fn event_flags(mask: ModifierMask) -> CGEventFlags {
    let mut flags = CGEventFlags::CGEventFlagNull;
    if mask.contains(ModifierMask::SHIFT) {
        flags |= CGEventFlags::CGEventFlagShift;
    }
    if mask.contains(ModifierMask::CONTROL) {
        flags |= CGEventFlags::CGEventFlagControl;
    }
    if mask.contains(ModifierMask::ALT) {
        flags |= CGEventFlags::CGEventFlagAlternate;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_flags_follow_mask() {
        assert_eq!(event_flags(ModifierMask::empty()), CGEventFlags::CGEventFlagNull);
        assert_eq!(
            event_flags(ModifierMask::SHIFT | ModifierMask::ALT),
            CGEventFlags::CGEventFlagShift | CGEventFlags::CGEventFlagAlternate
        );
    }

    /// A two-key layout: key 3 types f/F, key 7 types ƒ with option.
    fn tiny_layout(key: u16, state: u32) -> Option<u16> {
        match (key, state) {
            (3, 0x00) => Some(u16::from(b'f')),
            (3, 0x02) => Some(u16::from(b'F')),
            (7, 0x08) => Some(0x0192),
            _ => None,
        }
    }

    #[test]
    fn test_search_layout_reports_key_and_modifiers() {
        assert_eq!(search_layout('f', tiny_layout), Some((KeyId(3), ModifierMask::empty())));
        assert_eq!(search_layout('F', tiny_layout), Some((KeyId(3), ModifierMask::SHIFT)));
        assert_eq!(search_layout('ƒ', tiny_layout), Some((KeyId(7), ModifierMask::ALT)));
        assert_eq!(search_layout('g', tiny_layout), None);
    }

    #[test]
    fn test_search_layout_prefers_fewer_modifiers() {
        // Arrange: 'x' on key 9 unshifted and on key 1 with shift
        let layout = |key: u16, state: u32| match (key, state) {
            (9, 0x00) | (1, 0x02) => Some(u16::from(b'x')),
            _ => None,
        };

        // Act / Assert
        assert_eq!(search_layout('x', layout), Some((KeyId(9), ModifierMask::empty())));
    }

    #[test]
    fn test_search_layout_rejects_astral_characters() {
        assert_eq!(search_layout('😀', |_, _| Some(0xD83D)), None);
    }

    #[test]
    fn test_modifier_failure_aborts() {
        assert_eq!(MacosInput::new().modifier_failure_policy(), ModifierFailurePolicy::Abort);
    }
}
