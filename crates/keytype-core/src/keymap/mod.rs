//! Character → key resolution and the key code tables behind it.
//!
//! The engine never deals in platform codes directly.  It works with
//! [`KeyId`] (an opaque native key handle handed out by the platform layer)
//! and [`ModifierMask`] (which of shift/control/alt a character needs).
//!
//! [`resolve`] is the single entry point the typing session uses.  It handles
//! the characters whose keys never depend on the active layout and delegates
//! everything else to a [`KeyTranslator`].
//!
//! The sub-modules hold static tables: [`us_ansi`] maps printable ASCII to
//! USB HID key positions (the fallback layout), [`windows_vk`] and
//! [`macos_cg`] map those positions to native codes, and [`linux_x11`] names
//! characters as X11 KeySyms.

pub mod hid;
pub mod linux_x11;
pub mod macos_cg;
pub mod us_ansi;
pub mod windows_vk;

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use thiserror::Error;

pub use hid::HidKeyCode;

/// Opaque native key handle: a scan code, virtual key, `CGKeyCode` or X11
/// keycode depending on the platform that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(pub u16);

impl KeyId {
    /// Sentinel for "no key": resolving `'\r'` yields this and the session
    /// swallows it without emitting events.
    pub const NONE: KeyId = KeyId(u16::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("none")
        } else {
            write!(f, "0x{:04X}", self.0)
        }
    }
}

/// Bitset over the modifier keys a character may require.
///
/// The bit layout matches the shift-state byte returned by `VkKeyScanExW`
/// (1 = shift, 2 = control, 4 = alt).  On macOS, option maps to [`ALT`].
///
/// [`ALT`]: ModifierMask::ALT
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModifierMask(u8);

impl ModifierMask {
    pub const SHIFT: ModifierMask = ModifierMask(0x01);
    pub const CONTROL: ModifierMask = ModifierMask(0x02);
    pub const ALT: ModifierMask = ModifierMask(0x04);

    const ALL_BITS: u8 = 0x07;

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Builds a mask from raw bits, discarding bits outside shift/control/alt.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL_BITS)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    pub const fn contains(self, other: ModifierMask) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: ModifierMask) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: ModifierMask) {
        self.0 &= !other.0;
    }
}

impl BitOr for ModifierMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ModifierMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ModifierMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for ModifierMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names = [
            (Self::SHIFT, "shift"),
            (Self::CONTROL, "control"),
            (Self::ALT, "alt"),
        ];
        let mut first = true;
        for (bit, name) in names {
            if self.contains(bit) {
                if !first {
                    f.write_str("+")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// One modifier key as the platform sees it.
///
/// Windows queries key state by virtual key but injects by scan code, so the
/// two identifiers are kept apart.  Platforms using a single code space set
/// both to the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifierDescriptor {
    /// The single bit in [`ModifierMask`] this modifier satisfies.
    pub mask: ModifierMask,
    /// Key used for the "is it physically down?" query.
    pub state_key: KeyId,
    /// Key used for press and release events.
    pub event_key: KeyId,
}

/// Keys whose identity never depends on the keyboard layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixedKey {
    Return,
    Tab,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyDirection {
    Down,
    Up,
}

/// Opaque handle to a keyboard layout (`HKL` on Windows).
///
/// [`LayoutHandle::DEFAULT`] asks the translator to use whatever layout it
/// considers current, or its static table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LayoutHandle(pub usize);

impl LayoutHandle {
    pub const DEFAULT: LayoutHandle = LayoutHandle(0);
}

/// The active layout (or static table) has no key producing this character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no key mapping for {ch:?} (U+{:04X})", u32::from(*.ch))]
pub struct UnmappedCharacter {
    pub ch: char,
}

/// Character → native key translation, implemented by every platform.
pub trait KeyTranslator {
    /// Identifier of a key that bypasses layout translation.
    fn fixed_key(&self, key: FixedKey) -> KeyId;

    /// Translates `ch` under `layout` into a key and the modifiers it needs.
    fn translate_char(
        &self,
        ch: char,
        layout: LayoutHandle,
    ) -> Result<(KeyId, ModifierMask), UnmappedCharacter>;
}

/// A character after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub key: KeyId,
    pub modifiers: ModifierMask,
}

impl Resolved {
    /// Swallowed character: no key, no modifiers.
    pub const NOOP: Resolved = Resolved {
        key: KeyId::NONE,
        modifiers: ModifierMask::empty(),
    };

    pub fn new(key: KeyId, modifiers: ModifierMask) -> Self {
        Self { key, modifiers }
    }
}

/// Resolves one character to the key and modifiers that type it.
///
/// `'\r'` is swallowed, `'\n'`, `'\t'` and `' '` map to fixed keys with no
/// modifiers, and every other character goes through `translator`.
///
/// # Errors
///
/// Returns [`UnmappedCharacter`] when the translator has no mapping.
pub fn resolve<T>(translator: &T, ch: char, layout: LayoutHandle) -> Result<Resolved, UnmappedCharacter>
where
    T: KeyTranslator + ?Sized,
{
    let fixed = match ch {
        '\r' => return Ok(Resolved::NOOP),
        '\n' => FixedKey::Return,
        '\t' => FixedKey::Tab,
        ' ' => FixedKey::Space,
        _ => {
            let (key, modifiers) = translator.translate_char(ch, layout)?;
            return Ok(Resolved::new(key, modifiers));
        }
    };
    Ok(Resolved::new(translator.fixed_key(fixed), ModifierMask::empty()))
}
