//! The typing session loop.
//!
//! A [`TypingSession`] walks the text one character at a time on a blocking
//! thread.  Each character is resolved one step ahead so the sequencer knows
//! which modifiers the next character needs before releasing the current
//! ones.  Cancellation is checked once per character: a character whose
//! modifiers have been pressed is always finished, so every press is matched
//! by a release.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use keytype_core::{
    resolve, FailureKind, FailureLedger, FixedKey, LayoutHandle, ModifierMask, Resolved,
    TypingOptions, UnmappedPolicy,
};
use tracing::{debug, warn};

use super::platform::PlatformInput;
use super::sequencer::ModifierSequencer;

/// Cooperative stop flag shared between a session and its supervisor.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

pub struct TypingSession {
    platform: Arc<dyn PlatformInput>,
    options: TypingOptions,
    layout: LayoutHandle,
    token: CancelToken,
}

impl TypingSession {
    pub fn new(
        platform: Arc<dyn PlatformInput>,
        options: TypingOptions,
        layout: LayoutHandle,
        token: CancelToken,
    ) -> Self {
        Self {
            platform,
            options,
            layout,
            token,
        }
    }

    /// Types `text` and returns what went wrong along the way.
    ///
    /// Blocks the calling thread for the whole session.  Every modifier
    /// pressed by the session is released before this returns.
    pub fn run(&self, text: &str) -> FailureLedger {
        let mut ledger = FailureLedger::new();
        let chars: Vec<char> = text.chars().collect();
        let Some(&first) = chars.first() else {
            return ledger;
        };

        if self.options.on_unmapped_character == UnmappedPolicy::Abort && !self.all_mapped(&chars) {
            ledger.fatal(FailureKind::UnmappedCharacter);
            return ledger;
        }

        let platform = &*self.platform;
        let mut sequencer = ModifierSequencer::new(platform, &self.options);
        let mut current = self.resolve_or_skip(first, &mut ledger);

        for (index, &ch) in chars.iter().enumerate() {
            if self.token.take() {
                debug!(position = index, "session cancelled");
                ledger.fatal(FailureKind::Aborted);
                break;
            }

            if sequencer.press_for(current.modifiers, &mut ledger).is_break() {
                break;
            }
            self.type_key(ch, current, &mut sequencer, &mut ledger);

            let next = chars
                .get(index + 1)
                .map(|&next_ch| self.resolve_or_skip(next_ch, &mut ledger));
            sequencer.release_for(next.map_or(ModifierMask::empty(), |n| n.modifiers), &mut ledger);

            if let Some(next) = next {
                current = next;
                if !self.options.key_delay.is_zero() {
                    thread::sleep(self.options.key_delay);
                }
            }
        }

        sequencer.release_all(&mut ledger);
        ledger
    }

    fn type_key(
        &self,
        ch: char,
        resolved: Resolved,
        sequencer: &mut ModifierSequencer<'_>,
        ledger: &mut FailureLedger,
    ) {
        if resolved.key.is_none() {
            return;
        }
        match (ch, self.options.tab_expansion()) {
            ('\t', Some(spaces)) => {
                let space = self.platform.fixed_key(FixedKey::Space);
                sequencer.tap(space, spaces, ledger);
            }
            _ => sequencer.tap(resolved.key, 1, ledger),
        }
    }

    fn resolve_or_skip(&self, ch: char, ledger: &mut FailureLedger) -> Resolved {
        match resolve(&*self.platform, ch, self.layout) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("skipping character: {e}");
                ledger.recoverable(FailureKind::UnmappedCharacter);
                Resolved::NOOP
            }
        }
    }

    fn all_mapped(&self, chars: &[char]) -> bool {
        match chars
            .iter()
            .try_for_each(|&ch| resolve(&*self.platform, ch, self.layout).map(drop))
        {
            Ok(()) => true,
            Err(e) => {
                warn!("refusing input: {e}");
                false
            }
        }
    }
}
