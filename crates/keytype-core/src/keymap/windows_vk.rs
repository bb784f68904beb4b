//! HID Usage ID → Windows virtual key and set-1 scan code.
//!
//! Windows injects typed text by **scan code** (`KEYEVENTF_SCANCODE`) so the
//! event reaches applications exactly like a hardware keystroke, but reads
//! key state (`GetKeyState`) by **virtual key**.  Each entry therefore
//! carries both codes.
//!
//! Reference: winuser.h virtual-key codes and the PS/2 set-1 scan code table
//! for a US keyboard.

use super::hid::HidKeyCode;

/// Virtual key and scan code of one physical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowsKey {
    pub vk: u8,
    pub scan: u16,
}

pub const VK_LSHIFT: u8 = 0xA0;
pub const VK_LCONTROL: u8 = 0xA2;
pub const VK_LMENU: u8 = 0xA4;

/// Looks up the Windows codes for a HID key position.
///
/// Every [`HidKeyCode`] variant has an entry; the lookup returns `None` only
/// if the table and the enum drift apart.
pub fn hid_to_windows(hid: HidKeyCode) -> Option<WindowsKey> {
    TABLE
        .iter()
        .find(|(candidate, _, _)| *candidate == hid)
        .map(|&(_, vk, scan)| WindowsKey { vk, scan })
}

/// `(hid, virtual key, scan code)` for every typing-block key.
const TABLE: &[(HidKeyCode, u8, u16)] = {
    use HidKeyCode::*;
    &[
        // ── Letters: VK_A=0x41 … VK_Z=0x5A ────────────────────────────────────
        (KeyA, 0x41, 0x1E),
        (KeyB, 0x42, 0x30),
        (KeyC, 0x43, 0x2E),
        (KeyD, 0x44, 0x20),
        (KeyE, 0x45, 0x12),
        (KeyF, 0x46, 0x21),
        (KeyG, 0x47, 0x22),
        (KeyH, 0x48, 0x23),
        (KeyI, 0x49, 0x17),
        (KeyJ, 0x4A, 0x24),
        (KeyK, 0x4B, 0x25),
        (KeyL, 0x4C, 0x26),
        (KeyM, 0x4D, 0x32),
        (KeyN, 0x4E, 0x31),
        (KeyO, 0x4F, 0x18),
        (KeyP, 0x50, 0x19),
        (KeyQ, 0x51, 0x10),
        (KeyR, 0x52, 0x13),
        (KeyS, 0x53, 0x1F),
        (KeyT, 0x54, 0x14),
        (KeyU, 0x55, 0x16),
        (KeyV, 0x56, 0x2F),
        (KeyW, 0x57, 0x11),
        (KeyX, 0x58, 0x2D),
        (KeyY, 0x59, 0x15),
        (KeyZ, 0x5A, 0x2C),
        // ── Digit row: VK_0=0x30 … VK_9=0x39 ─────────────────────────────────
        (Digit1, 0x31, 0x02),
        (Digit2, 0x32, 0x03),
        (Digit3, 0x33, 0x04),
        (Digit4, 0x34, 0x05),
        (Digit5, 0x35, 0x06),
        (Digit6, 0x36, 0x07),
        (Digit7, 0x37, 0x08),
        (Digit8, 0x38, 0x09),
        (Digit9, 0x39, 0x0A),
        (Digit0, 0x30, 0x0B),
        // ── Whitespace ────────────────────────────────────────────────────────
        (Enter, 0x0D, 0x1C), // VK_RETURN
        (Tab, 0x09, 0x0F),   // VK_TAB
        (Space, 0x20, 0x39), // VK_SPACE
        // ── Punctuation (VK_OEM_*) ────────────────────────────────────────────
        (Minus, 0xBD, 0x0C),
        (Equal, 0xBB, 0x0D),
        (BracketLeft, 0xDB, 0x1A),
        (BracketRight, 0xDD, 0x1B),
        (Backslash, 0xDC, 0x2B),
        (Semicolon, 0xBA, 0x27),
        (Quote, 0xDE, 0x28),
        (Backquote, 0xC0, 0x29),
        (Comma, 0xBC, 0x33),
        (Period, 0xBE, 0x34),
        (Slash, 0xBF, 0x35),
        // ── Modifiers ─────────────────────────────────────────────────────────
        (ControlLeft, VK_LCONTROL, 0x1D),
        (ShiftLeft, VK_LSHIFT, 0x2A),
        (AltLeft, VK_LMENU, 0x38),
    ]
};
