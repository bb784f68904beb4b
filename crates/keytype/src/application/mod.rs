//! Application layer of the typing engine.
//!
//! Everything here is written once against [`platform::PlatformInput`]; the
//! native implementations live in `crate::infrastructure::platform`.
//!
//! - **`platform`** – the capability traits every OS backend implements.
//! - **`sequencer`** – presses and releases modifiers around each key.
//! - **`session`** – the per-character loop and its cancellation token.
//! - **`guard`** – races the session against the timeout and abort signal.
//! - **`focus`** – Windows focus stealing, undone exactly once.
//! - **`typist`** – the public `type_string` entry point tying it together.

pub mod focus;
pub mod guard;
pub mod platform;
pub mod sequencer;
pub mod session;
pub mod typist;
