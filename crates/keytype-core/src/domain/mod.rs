//! Session configuration and failure bookkeeping.
//!
//! Nothing in here touches the operating system.  The engine crate takes a
//! [`options::TypingOptions`] snapshot at the start of each session and fills
//! a [`failure::FailureLedger`] while it types.

pub mod failure;
pub mod options;
