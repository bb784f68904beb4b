//! Platform-specific keyboard input implementations.
//!
//! The correct implementation is selected at compile time via
//! `#[cfg(target_os = ...)]`; [`native`] constructs it.

use std::sync::Arc;

use crate::application::platform::{InputError, PlatformInput};

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "macos")]
pub mod macos;

/// Opens the input backend for the operating system this binary was built
/// for.
///
/// # Errors
///
/// Returns [`InputError::Unavailable`] when the backend cannot be opened (no
/// X display, for example) or the target OS has no backend.
pub fn native() -> Result<Arc<dyn PlatformInput>, InputError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Arc::new(windows::WindowsInput::new()))
    }

    #[cfg(target_os = "macos")]
    {
        Ok(Arc::new(macos::MacosInput::new()))
    }

    #[cfg(target_os = "linux")]
    {
        Ok(Arc::new(linux::X11Input::open()?))
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        Err(InputError::Unavailable(format!(
            "no keyboard backend for {}",
            std::env::consts::OS
        )))
    }
}
