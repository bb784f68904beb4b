//! # keytype-core
//!
//! Platform-independent building blocks for the keytype typing engine.
//!
//! This crate has no dependencies on OS APIs.  It defines:
//!
//! - **`keymap`** – How a character becomes a key.  [`KeyId`] is the opaque
//!   native key handle, [`ModifierMask`] the set of modifiers a character
//!   needs, and [`resolve`] applies the fixed rules for carriage return,
//!   newline, tab and space before delegating to a [`KeyTranslator`].  The
//!   static US-ANSI fallback table and the HID → native code tables for
//!   Windows, macOS and X11 live here too.
//!
//! - **`domain`** – The session configuration ([`TypingOptions`]) and the
//!   failure bookkeeping ([`FailureLedger`], [`TypingError`]) that turns many
//!   per-key failures into one aggregated error.

pub mod domain;
pub mod keymap;

pub use domain::failure::{FailureKind, FailureLedger, Severity, TypingError};
pub use domain::options::{TypingOptions, UnmappedPolicy};
pub use keymap::hid::HidKeyCode;
pub use keymap::{
    resolve, FixedKey, KeyDirection, KeyId, KeyTranslator, LayoutHandle, ModifierDescriptor,
    ModifierMask, Resolved, UnmappedCharacter,
};
