//! Windows keyboard input via `SendInput`.
//!
//! Characters are translated under the foreground window's keyboard layout:
//! `VkKeyScanExW` yields a virtual key plus the shift-state byte, and
//! `MapVirtualKeyExW` turns the virtual key into a set-1 scan code.  Events
//! are injected by scan code (`KEYEVENTF_SCANCODE`) so applications see them
//! exactly like hardware keystrokes.  Key state is read with `GetKeyState`,
//! which takes a virtual key; the modifier descriptors therefore carry both
//! codes.
//!
//! This backend is also the only [`FocusControl`] implementation: attaching
//! to the foreground thread's input queue and `BlockInput` are Windows
//! concepts.

#![cfg(target_os = "windows")]

use std::ffi::c_void;

use keytype_core::keymap::windows_vk::{hid_to_windows, VK_LCONTROL, VK_LMENU, VK_LSHIFT};
use keytype_core::{
    FixedKey, HidKeyCode, KeyDirection, KeyId, KeyTranslator, LayoutHandle, ModifierDescriptor,
    ModifierMask, UnmappedCharacter,
};
use tracing::{trace, warn};
use windows::Win32::Foundation::{BOOL, HWND};
use windows::Win32::System::Threading::{AttachThreadInput, GetCurrentThreadId};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    BlockInput, GetKeyState, GetKeyboardLayout, MapVirtualKeyExW, SendInput, SetFocus,
    VkKeyScanExW, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE, MAPVK_VK_TO_VSC_EX, VIRTUAL_KEY,
};
use windows::Win32::UI::TextServices::HKL;
use windows::Win32::UI::WindowsAndMessaging::{
    BringWindowToTop, GetForegroundWindow, GetWindowThreadProcessId, SetForegroundWindow,
};

use crate::application::platform::{
    FocusControl, InputError, PlatformInput, QueueId, WindowHandle,
};

/// Prefix `MapVirtualKeyExW` puts in the high byte of extended scan codes.
const EXTENDED_PREFIX: u16 = 0xE000;

/// Windows implementation of [`PlatformInput`] and [`FocusControl`].
pub struct WindowsInput {
    modifiers: [ModifierDescriptor; 3],
}

impl WindowsInput {
    pub fn new() -> Self {
        Self {
            modifiers: [
                modifier(ModifierMask::SHIFT, HidKeyCode::ShiftLeft, VK_LSHIFT),
                modifier(ModifierMask::CONTROL, HidKeyCode::ControlLeft, VK_LCONTROL),
                modifier(ModifierMask::ALT, HidKeyCode::AltLeft, VK_LMENU),
            ],
        }
    }
}

impl Default for WindowsInput {
    fn default() -> Self {
        Self::new()
    }
}

/// State is queried by virtual key, events are sent by scan code.
fn modifier(mask: ModifierMask, hid: HidKeyCode, vk: u8) -> ModifierDescriptor {
    let scan = hid_to_windows(hid).map_or(0, |key| key.scan);
    ModifierDescriptor {
        mask,
        state_key: KeyId(u16::from(vk)),
        event_key: KeyId(scan),
    }
}

impl KeyTranslator for WindowsInput {
    fn fixed_key(&self, key: FixedKey) -> KeyId {
        let hid = match key {
            FixedKey::Return => HidKeyCode::Enter,
            FixedKey::Tab => HidKeyCode::Tab,
            FixedKey::Space => HidKeyCode::Space,
        };
        hid_to_windows(hid).map_or(KeyId::NONE, |k| KeyId(k.scan))
    }

    fn translate_char(
        &self,
        ch: char,
        layout: LayoutHandle,
    ) -> Result<(KeyId, ModifierMask), UnmappedCharacter> {
        let unmapped = UnmappedCharacter { ch };
        // VkKeyScanExW takes one UTF-16 unit; astral characters cannot be typed.
        let unit = u16::try_from(u32::from(ch)).map_err(|_| unmapped)?;
        let hkl = to_hkl(layout);

        // SAFETY: VkKeyScanExW only reads its arguments.
        let scanned = unsafe { VkKeyScanExW(unit, hkl) };
        if scanned == -1 {
            return Err(unmapped);
        }
        let [vk, shift_state] = (scanned as u16).to_le_bytes();

        // SAFETY: MapVirtualKeyExW only reads its arguments.
        let scan = unsafe { MapVirtualKeyExW(u32::from(vk), MAPVK_VK_TO_VSC_EX, hkl) };
        if scan == 0 {
            return Err(unmapped);
        }

        Ok((KeyId(scan as u16), ModifierMask::from_bits_truncate(shift_state)))
    }
}

impl PlatformInput for WindowsInput {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn modifiers(&self) -> &[ModifierDescriptor] {
        &self.modifiers
    }

    fn keyboard_layout(&self, owner: Option<QueueId>) -> LayoutHandle {
        // Thread id 0 is the calling thread.
        let thread = owner.map_or(0, |queue| queue.0);
        // SAFETY: GetKeyboardLayout accepts any thread id and returns the
        // process default for unknown ones.
        let hkl = unsafe { GetKeyboardLayout(thread) };
        LayoutHandle(hkl.0 as usize)
    }

    fn inject_key_event(
        &self,
        key: KeyId,
        direction: KeyDirection,
        _flags: ModifierMask,
    ) -> Result<(), InputError> {
        if key.is_none() {
            return Err(InputError::InvalidKey(key));
        }
        let mut flags = KEYEVENTF_SCANCODE | extended_flag(key);
        if direction == KeyDirection::Up {
            flags |= KEYEVENTF_KEYUP;
        }

        let input = INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(0),
                    wScan: key.0 & 0x00FF,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        // SAFETY: input is a valid KEYBDINPUT structure on the stack
        let inserted = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        trace!(%key, ?direction, inserted, "SendInput");
        if inserted == 1 {
            Ok(())
        } else {
            Err(InputError::native("SendInput", last_error()))
        }
    }

    /// `key` is a virtual-key code.
    fn key_is_down(&self, key: KeyId) -> bool {
        // SAFETY: GetKeyState only reads the calling thread's key state.
        let state = unsafe { GetKeyState(i32::from(key.0)) };
        state < 0
    }

    fn focus_control(&self) -> Option<&dyn FocusControl> {
        Some(self)
    }
}

impl FocusControl for WindowsInput {
    fn foreground_window(&self) -> Option<(WindowHandle, QueueId)> {
        // SAFETY: no arguments; a null handle means no foreground window.
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.0.is_null() {
            return None;
        }
        // SAFETY: hwnd was just returned by the system; a stale handle yields 0.
        let thread = unsafe { GetWindowThreadProcessId(hwnd, None) };
        if thread == 0 {
            return None;
        }
        Some((WindowHandle(hwnd.0 as usize), QueueId(thread)))
    }

    fn current_queue(&self) -> QueueId {
        // SAFETY: always safe to call.
        QueueId(unsafe { GetCurrentThreadId() })
    }

    fn attach_input_queues(&self, from: QueueId, to: QueueId, attach: bool) -> Result<(), InputError> {
        // SAFETY: thread ids are plain integers; invalid ones make the call fail.
        let ok = unsafe { AttachThreadInput(from.0, to.0, BOOL::from(attach)) };
        if ok.as_bool() {
            Ok(())
        } else {
            Err(InputError::native("AttachThreadInput", last_error()))
        }
    }

    fn block_other_input(&self, block: bool) -> Result<(), InputError> {
        // SAFETY: BlockInput has no pointer arguments.  Unblocking must happen
        // on the thread that blocked, which the typing worker guarantees.
        unsafe { BlockInput(BOOL::from(block)) }
            .map_err(|e| InputError::native("BlockInput", e.message()))
    }

    fn bring_to_front_and_focus(&self, window: WindowHandle) -> Result<(), InputError> {
        let hwnd = HWND(window.0 as *mut c_void);
        // SAFETY: hwnd came from GetForegroundWindow; a stale handle makes the
        // calls fail rather than misbehave.
        let steps = unsafe {
            [
                BringWindowToTop(hwnd).map_err(|e| InputError::native("BringWindowToTop", e.message())),
                if SetForegroundWindow(hwnd).as_bool() {
                    Ok(())
                } else {
                    Err(InputError::native("SetForegroundWindow", "window not brought to the foreground"))
                },
                SetFocus(hwnd)
                    .map(|_| ())
                    .map_err(|e| InputError::native("SetFocus", e.message())),
            ]
        };
        first_failure(steps)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Logs every failed step and returns the first failure.
fn first_failure(steps: impl IntoIterator<Item = Result<(), InputError>>) -> Result<(), InputError> {
    let mut first = Ok(());
    for step in steps {
        if let Err(e) = step {
            warn!("focus step failed: {e}");
            if first.is_ok() {
                first = Err(e);
            }
        }
    }
    first
}

fn to_hkl(layout: LayoutHandle) -> HKL {
    if layout == LayoutHandle::DEFAULT {
        // SAFETY: 0 selects the calling thread's layout.
        unsafe { GetKeyboardLayout(0) }
    } else {
        HKL(layout.0 as *mut c_void)
    }
}

fn extended_flag(key: KeyId) -> KEYBD_EVENT_FLAGS {
    if key.0 & 0xFF00 == EXTENDED_PREFIX {
        KEYEVENTF_EXTENDEDKEY
    } else {
        KEYBD_EVENT_FLAGS(0)
    }
}

fn last_error() -> String {
    windows::core::Error::from_win32().message()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_query_by_virtual_key_and_send_by_scan_code() {
        let input = WindowsInput::new();
        let shift = input.modifiers()[0];
        assert_eq!(shift.mask, ModifierMask::SHIFT);
        assert_eq!(shift.state_key, KeyId(0xA0));
        assert_eq!(shift.event_key, KeyId(0x2A));
    }

    #[test]
    fn test_fixed_keys_are_scan_codes() {
        let input = WindowsInput::new();
        assert_eq!(input.fixed_key(FixedKey::Return), KeyId(0x1C));
        assert_eq!(input.fixed_key(FixedKey::Tab), KeyId(0x0F));
        assert_eq!(input.fixed_key(FixedKey::Space), KeyId(0x39));
    }

    #[test]
    fn test_extended_prefix_sets_extended_flag() {
        assert_eq!(extended_flag(KeyId(0xE01D)), KEYEVENTF_EXTENDEDKEY);
        assert_eq!(extended_flag(KeyId(0x001D)), KEYBD_EVENT_FLAGS(0));
    }

    #[test]
    fn test_first_failure_keeps_earliest_error_after_all_steps() {
        // Arrange
        let steps = vec![
            Ok(()),
            Err(InputError::native("SetForegroundWindow", "denied")),
            Err(InputError::native("SetFocus", "denied")),
        ];

        // Act
        let err = first_failure(steps).unwrap_err();

        // Assert
        assert!(err.to_string().contains("SetForegroundWindow"), "{err}");
        assert!(first_failure([Ok(()), Ok(())]).is_ok());
    }

    #[test]
    fn test_astral_character_is_unmapped() {
        let input = WindowsInput::new();
        let err = input.translate_char('😀', LayoutHandle::DEFAULT).unwrap_err();
        assert_eq!(err.ch, '😀');
    }
}
