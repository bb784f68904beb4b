//! keytype library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does keytype do?
//!
//! Given a string, keytype presses and releases the keys that produce it,
//! one character at a time, in whatever window currently has keyboard focus.
//! Applications see ordinary keystrokes, not a paste.
//!
//! 1. Each character is resolved to a native key plus the modifiers it
//!    needs (`keytype_core::resolve`).
//! 2. The typing session presses those modifiers, taps the key and releases
//!    modifiers the next character does not need.
//! 3. A cancellation guard stops the session at the next character boundary
//!    when the timeout expires or [`request_abort`] is called.
//! 4. On Windows, the foreground window's input queue is attached and other
//!    input is blocked for the duration of the call.

/// Application layer: the typing engine, written against the platform traits.
pub mod application;

/// Infrastructure layer: native platform bindings and configuration storage.
pub mod infrastructure;

pub use application::typist::{request_abort, Typist};
