//! Recording platform for tests and `--dry-run`.
//!
//! `MockPlatform` performs no OS calls.  Every injected key event is pushed
//! into a `Mutex<Vec<...>>` so callers can inspect exactly what would have
//! been typed, and in what order.  Key identifiers are USB HID Usage IDs and
//! characters are translated with the static US-ANSI table.
//!
//! ```ignore
//! let platform = Arc::new(MockPlatform::new());
//! let typist = Typist::new(platform.clone());
//!
//! typist.type_string("cat", &TypingOptions::instant()).await?;
//!
//! assert_eq!(platform.events().len(), 6);
//! ```
//!
//! Failure paths are exercised with [`MockPlatform::failing`] (every
//! injection is rejected) and [`MockPlatform::with_event_latency`] (each
//! event takes wall-clock time, so a timeout or abort can land mid-string).

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use keytype_core::keymap::us_ansi;
use keytype_core::{
    FixedKey, HidKeyCode, KeyDirection, KeyId, KeyTranslator, LayoutHandle, ModifierDescriptor,
    ModifierMask, UnmappedCharacter,
};

use crate::application::platform::{
    FocusControl, InputError, ModifierFailurePolicy, PlatformInput,
};

/// One injected key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedEvent {
    pub key: KeyId,
    pub direction: KeyDirection,
    pub flags: ModifierMask,
}

pub const SHIFT_KEY: KeyId = KeyId(HidKeyCode::ShiftLeft as u16);
pub const CONTROL_KEY: KeyId = KeyId(HidKeyCode::ControlLeft as u16);
pub const ALT_KEY: KeyId = KeyId(HidKeyCode::AltLeft as u16);

const MODIFIERS: [ModifierDescriptor; 3] = [
    ModifierDescriptor {
        mask: ModifierMask::SHIFT,
        state_key: SHIFT_KEY,
        event_key: SHIFT_KEY,
    },
    ModifierDescriptor {
        mask: ModifierMask::CONTROL,
        state_key: CONTROL_KEY,
        event_key: CONTROL_KEY,
    },
    ModifierDescriptor {
        mask: ModifierMask::ALT,
        state_key: ALT_KEY,
        event_key: ALT_KEY,
    },
];

/// A platform that records key events instead of injecting them.
#[derive(Default)]
pub struct MockPlatform {
    events: Mutex<Vec<RecordedEvent>>,
    /// Keys pressed through this platform and not yet released.
    down: Mutex<HashSet<KeyId>>,
    /// Keys the "user" is holding; reported down but never recorded.
    held_externally: Mutex<HashSet<KeyId>>,
    should_fail: bool,
    latency: Duration,
    policy: ModifierFailurePolicy,
    focus: Option<Arc<dyn FocusControl>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `inject_key_event` call fails.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Each injected event blocks the calling thread for `latency`.
    pub fn with_event_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_modifier_policy(mut self, policy: ModifierFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_focus_control(mut self, focus: Arc<dyn FocusControl>) -> Self {
        self.focus = Some(focus);
        self
    }

    /// Simulates the user physically holding `key`.
    pub fn hold_externally(&self, key: KeyId) {
        lock(&self.held_externally).insert(key);
    }

    /// Snapshot of every recorded event, oldest first.
    pub fn events(&self) -> Vec<RecordedEvent> {
        lock(&self.events).clone()
    }

    pub fn count(&self, key: KeyId, direction: KeyDirection) -> usize {
        lock(&self.events)
            .iter()
            .filter(|e| e.key == key && e.direction == direction)
            .count()
    }

    /// Events on modifier keys only.
    pub fn modifier_events(&self) -> Vec<RecordedEvent> {
        lock(&self.events)
            .iter()
            .filter(|e| MODIFIERS.iter().any(|m| m.event_key == e.key))
            .copied()
            .collect()
    }

    /// Keys pressed through this platform that were never released.
    pub fn keys_still_down(&self) -> Vec<KeyId> {
        let mut keys: Vec<KeyId> = lock(&self.down).iter().copied().collect();
        keys.sort();
        keys
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn hid_key(hid: HidKeyCode) -> KeyId {
    KeyId(hid.as_u16())
}

impl KeyTranslator for MockPlatform {
    fn fixed_key(&self, key: FixedKey) -> KeyId {
        match key {
            FixedKey::Return => hid_key(HidKeyCode::Enter),
            FixedKey::Tab => hid_key(HidKeyCode::Tab),
            FixedKey::Space => hid_key(HidKeyCode::Space),
        }
    }

    fn translate_char(
        &self,
        ch: char,
        _layout: LayoutHandle,
    ) -> Result<(KeyId, ModifierMask), UnmappedCharacter> {
        us_ansi::lookup(ch)
            .map(|(hid, mods)| (hid_key(hid), mods))
            .ok_or(UnmappedCharacter { ch })
    }
}

impl PlatformInput for MockPlatform {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn modifiers(&self) -> &[ModifierDescriptor] {
        &MODIFIERS
    }

    fn inject_key_event(
        &self,
        key: KeyId,
        direction: KeyDirection,
        flags: ModifierMask,
    ) -> Result<(), InputError> {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        if self.should_fail {
            return Err(InputError::native("mock inject", "mock failure"));
        }
        lock(&self.events).push(RecordedEvent {
            key,
            direction,
            flags,
        });
        let mut down = lock(&self.down);
        match direction {
            KeyDirection::Down => down.insert(key),
            KeyDirection::Up => down.remove(&key),
        };
        Ok(())
    }

    fn key_is_down(&self, key: KeyId) -> bool {
        lock(&self.held_externally).contains(&key) || lock(&self.down).contains(&key)
    }

    fn modifier_failure_policy(&self) -> ModifierFailurePolicy {
        self.policy
    }

    fn focus_control(&self) -> Option<&dyn FocusControl> {
        self.focus.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_records_event_and_tracks_down_state() {
        // Arrange
        let platform = MockPlatform::new();
        let key = hid_key(HidKeyCode::KeyA);

        // Act
        platform.inject_key_event(key, KeyDirection::Down, ModifierMask::empty()).unwrap();

        // Assert
        assert!(platform.key_is_down(key));
        assert_eq!(platform.keys_still_down(), vec![key]);

        platform.inject_key_event(key, KeyDirection::Up, ModifierMask::empty()).unwrap();
        assert!(!platform.key_is_down(key));
        assert_eq!(platform.events().len(), 2);
    }

    #[test]
    fn test_failing_platform_records_nothing() {
        let platform = MockPlatform::failing();
        let result = platform.inject_key_event(SHIFT_KEY, KeyDirection::Down, ModifierMask::SHIFT);
        assert!(result.is_err());
        assert!(platform.events().is_empty());
        assert!(!platform.key_is_down(SHIFT_KEY));
    }

    #[test]
    fn test_externally_held_key_is_down_but_unrecorded() {
        let platform = MockPlatform::new();
        platform.hold_externally(SHIFT_KEY);
        assert!(platform.key_is_down(SHIFT_KEY));
        assert!(platform.keys_still_down().is_empty());
    }

    #[test]
    fn test_translation_uses_hid_usage_ids() {
        let platform = MockPlatform::new();
        let (key, mods) = platform.translate_char('A', LayoutHandle::DEFAULT).unwrap();
        assert_eq!(key, KeyId(0x04));
        assert_eq!(mods, ModifierMask::SHIFT);
        assert_eq!(platform.fixed_key(FixedKey::Space), KeyId(0x2C));
        assert!(platform.translate_char('é', LayoutHandle::DEFAULT).is_err());
    }

    #[test]
    fn test_modifier_events_filter() {
        let platform = MockPlatform::new();
        platform.inject_key_event(SHIFT_KEY, KeyDirection::Down, ModifierMask::SHIFT).unwrap();
        platform
            .inject_key_event(hid_key(HidKeyCode::KeyA), KeyDirection::Down, ModifierMask::SHIFT)
            .unwrap();
        assert_eq!(platform.modifier_events().len(), 1);
        assert_eq!(platform.count(SHIFT_KEY, KeyDirection::Down), 1);
    }
}
