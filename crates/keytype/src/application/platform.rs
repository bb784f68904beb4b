//! Capability traits implemented by each native platform.
//!
//! The engine never calls an OS API directly.  It asks a [`PlatformInput`]
//! to translate characters, inject key events and query key state, and, on
//! platforms that need it, a [`FocusControl`] to take over the foreground
//! window's input queue.

use keytype_core::{KeyDirection, KeyId, KeyTranslator, LayoutHandle, ModifierDescriptor, ModifierMask};
use thiserror::Error;

/// Error returned by a native platform call.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("{call} failed: {reason}")]
    Native { call: &'static str, reason: String },

    #[error("key {0} has no native code")]
    InvalidKey(KeyId),

    #[error("input backend unavailable: {0}")]
    Unavailable(String),
}

impl InputError {
    pub fn native(call: &'static str, reason: impl Into<String>) -> Self {
        Self::Native {
            call,
            reason: reason.into(),
        }
    }
}

/// What the sequencer does when pressing a modifier fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModifierFailurePolicy {
    /// Count the failure and type the key anyway.
    #[default]
    Continue,
    /// Stop the session.  Used where key events carry modifier flags, so a
    /// missing modifier would type the wrong character.
    Abort,
}

/// Opaque foreground window handle (`HWND` on Windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub usize);

/// Identifier of the thread owning an input queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueId(pub u32);

/// Native keyboard input for one operating system.
pub trait PlatformInput: KeyTranslator + Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// The modifiers this platform can press, in press order.
    fn modifiers(&self) -> &[ModifierDescriptor];

    /// Layout used to translate characters for a window whose input queue is
    /// owned by `owner`.  `None` means "no foreground window known".
    fn keyboard_layout(&self, _owner: Option<QueueId>) -> LayoutHandle {
        LayoutHandle::DEFAULT
    }

    /// Synthesizes one key event.  `flags` lists the modifiers currently
    /// held by the engine.
    fn inject_key_event(
        &self,
        key: KeyId,
        direction: KeyDirection,
        flags: ModifierMask,
    ) -> Result<(), InputError>;

    /// Whether `key` is physically down right now.
    fn key_is_down(&self, key: KeyId) -> bool;

    fn modifier_failure_policy(&self) -> ModifierFailurePolicy {
        ModifierFailurePolicy::Continue
    }

    /// Focus primitives, on platforms where typing needs them.
    fn focus_control(&self) -> Option<&dyn FocusControl> {
        None
    }
}

/// Foreground window and input-queue primitives.
#[cfg_attr(test, mockall::automock)]
pub trait FocusControl: Send + Sync {
    /// The foreground window and the thread owning its input queue.
    fn foreground_window(&self) -> Option<(WindowHandle, QueueId)>;

    /// The calling thread's input queue.
    fn current_queue(&self) -> QueueId;

    fn attach_input_queues(&self, from: QueueId, to: QueueId, attach: bool) -> Result<(), InputError>;

    /// Blocks (or unblocks) keyboard and mouse input from every other source.
    fn block_other_input(&self, block: bool) -> Result<(), InputError>;

    fn bring_to_front_and_focus(&self, window: WindowHandle) -> Result<(), InputError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_error_display() {
        let err = InputError::native("SendInput", "0 of 1 events inserted");
        assert_eq!(err.to_string(), "SendInput failed: 0 of 1 events inserted");
    }

    #[test]
    fn test_invalid_key_display() {
        assert_eq!(InputError::InvalidKey(KeyId(0x1E)).to_string(), "key 0x001E has no native code");
    }

    #[test]
    fn test_default_modifier_policy_is_continue() {
        assert_eq!(ModifierFailurePolicy::default(), ModifierFailurePolicy::Continue);
    }
}
