//! Infrastructure layer for keytype.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `keytype_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`platform`** – OS-specific implementations of `PlatformInput`.  The
//!   implementation for the compile target is picked by [`platform::native`].
//!   A recording `MockPlatform` is also provided for tests and dry runs.
//!
//! - **`storage`** – the TOML configuration file.

pub mod platform;
pub mod storage;
