//! Modifier sequencing around each typed key.
//!
//! For every character the session asks the sequencer to
//!
//! 1. press the modifiers the character needs ([`ModifierSequencer::press_for`]),
//! 2. tap the main key ([`ModifierSequencer::tap`]),
//! 3. release the modifiers the *next* character does not need
//!    ([`ModifierSequencer::release_for`]).
//!
//! Typing `"AB"` therefore produces one shift press, two taps and one shift
//! release.  The sequencer only ever releases modifiers it pressed itself;
//! a modifier the user is physically holding is neither pressed nor released.

use std::ops::ControlFlow;
use std::thread;
use std::time::Duration;

use keytype_core::{FailureKind, FailureLedger, KeyDirection, KeyId, ModifierMask, TypingOptions};
use tracing::{trace, warn};

use super::platform::{ModifierFailurePolicy, PlatformInput};

pub struct ModifierSequencer<'a> {
    platform: &'a dyn PlatformInput,
    mod_press_duration: Duration,
    key_press_duration: Duration,
    /// Modifiers pressed by this sequencer and not yet released.
    held: ModifierMask,
}

impl<'a> ModifierSequencer<'a> {
    pub fn new(platform: &'a dyn PlatformInput, options: &TypingOptions) -> Self {
        Self {
            platform,
            mod_press_duration: options.mod_press_duration,
            key_press_duration: options.key_press_duration,
            held: ModifierMask::empty(),
        }
    }

    pub fn held(&self) -> ModifierMask {
        self.held
    }

    /// Presses every modifier in `mask` that is neither held by us nor
    /// physically down, then waits `mod_press_duration` once if anything was
    /// pressed.
    ///
    /// Returns `Break` when a press failed under
    /// [`ModifierFailurePolicy::Abort`]; the failure is already recorded as
    /// fatal and every modifier this sequencer held has been released.
    pub fn press_for(&mut self, mask: ModifierMask, ledger: &mut FailureLedger) -> ControlFlow<()> {
        let mut pressed_any = false;

        for modifier in self.platform.modifiers() {
            if !mask.contains(modifier.mask) || self.held.contains(modifier.mask) {
                continue;
            }
            if self.platform.key_is_down(modifier.state_key) {
                trace!(modifier = %modifier.mask, "modifier already down");
                continue;
            }

            let flags = self.held | modifier.mask;
            match self
                .platform
                .inject_key_event(modifier.event_key, KeyDirection::Down, flags)
            {
                Ok(()) => {
                    trace!(key = %modifier.event_key, modifier = %modifier.mask, "modifier down");
                    self.held.insert(modifier.mask);
                    pressed_any = true;
                }
                Err(e) => {
                    warn!(modifier = %modifier.mask, "modifier press failed: {e}");
                    if self.platform.modifier_failure_policy() == ModifierFailurePolicy::Abort {
                        ledger.fatal(FailureKind::Injection);
                        self.release_all(ledger);
                        return ControlFlow::Break(());
                    }
                    ledger.recoverable(FailureKind::Injection);
                }
            }
        }

        if pressed_any {
            pause(self.mod_press_duration);
        }
        ControlFlow::Continue(())
    }

    /// Presses and releases `key` `times` times, holding it down for
    /// `key_press_duration` each time.
    ///
    /// The release is attempted even when the press failed.
    pub fn tap(&mut self, key: KeyId, times: usize, ledger: &mut FailureLedger) {
        for _ in 0..times {
            self.inject(key, KeyDirection::Down, ledger);
            pause(self.key_press_duration);
            self.inject(key, KeyDirection::Up, ledger);
        }
    }

    /// Releases held modifiers that are not part of `next`.
    pub fn release_for(&mut self, next: ModifierMask, ledger: &mut FailureLedger) {
        for modifier in self.platform.modifiers() {
            if !self.held.contains(modifier.mask) || next.contains(modifier.mask) {
                continue;
            }
            self.held.remove(modifier.mask);
            match self
                .platform
                .inject_key_event(modifier.event_key, KeyDirection::Up, self.held)
            {
                Ok(()) => trace!(key = %modifier.event_key, modifier = %modifier.mask, "modifier up"),
                Err(e) => {
                    warn!(modifier = %modifier.mask, "modifier release failed: {e}");
                    ledger.recoverable(FailureKind::Injection);
                }
            }
        }
    }

    /// Releases every modifier this sequencer still holds.
    pub fn release_all(&mut self, ledger: &mut FailureLedger) {
        self.release_for(ModifierMask::empty(), ledger);
    }

    fn inject(&self, key: KeyId, direction: KeyDirection, ledger: &mut FailureLedger) {
        match self.platform.inject_key_event(key, direction, self.held) {
            Ok(()) => trace!(%key, ?direction, flags = %self.held, "key event"),
            Err(e) => {
                warn!(%key, ?direction, "key event failed: {e}");
                ledger.recoverable(FailureKind::Injection);
            }
        }
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
