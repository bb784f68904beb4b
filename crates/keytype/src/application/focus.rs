//! Foreground focus stealing for the duration of one typing session.
//!
//! Windows only delivers synthesized keystrokes reliably to the foreground
//! window when the typing thread shares its input queue.  The stealer:
//!
//! 1. finds the foreground window and the thread owning its queue,
//! 2. attaches our queue to it when they differ,
//! 3. brings the window to the top and focuses it,
//! 4. blocks input from every other source.
//!
//! [`FocusStealer::release`] undoes step 4 then step 2, exactly once.  Every
//! step is best effort: a failure is recorded in the ledger and the session
//! goes ahead.

use keytype_core::{FailureKind, FailureLedger};
use tracing::{debug, warn};

use super::platform::{FocusControl, QueueId};

pub struct FocusStealer<'a> {
    control: &'a dyn FocusControl,
    owner: Option<QueueId>,
    /// `(ours, theirs)` when the attach succeeded.
    attached: Option<(QueueId, QueueId)>,
    blocked: bool,
    released: bool,
}

impl<'a> FocusStealer<'a> {
    pub fn acquire(control: &'a dyn FocusControl, ledger: &mut FailureLedger) -> Self {
        let mut stealer = Self {
            control,
            owner: None,
            attached: None,
            blocked: false,
            released: false,
        };

        match control.foreground_window() {
            Some((window, owner)) => {
                stealer.owner = Some(owner);
                let ours = control.current_queue();
                if ours != owner {
                    match control.attach_input_queues(ours, owner, true) {
                        Ok(()) => stealer.attached = Some((ours, owner)),
                        Err(e) => record(ledger, "attach input queues", &e),
                    }
                }
                if let Err(e) = control.bring_to_front_and_focus(window) {
                    record(ledger, "focus foreground window", &e);
                }
                debug!(window = window.0, owner = owner.0, attached = stealer.attached.is_some(), "focus acquired");
            }
            None => {
                warn!("no foreground window");
                ledger.recoverable(FailureKind::FocusOperation);
            }
        }

        match control.block_other_input(true) {
            Ok(()) => stealer.blocked = true,
            Err(e) => record(ledger, "block input", &e),
        }

        stealer
    }

    /// Thread owning the foreground window's input queue, if one was found.
    pub fn owner_queue(&self) -> Option<QueueId> {
        self.owner
    }

    /// Unblocks input, then detaches the queues.  Later calls do nothing.
    pub fn release(&mut self, ledger: &mut FailureLedger) {
        if self.released {
            return;
        }
        self.released = true;

        if self.blocked {
            if let Err(e) = self.control.block_other_input(false) {
                record(ledger, "unblock input", &e);
            }
            self.blocked = false;
        }
        if let Some((ours, theirs)) = self.attached.take() {
            if let Err(e) = self.control.attach_input_queues(ours, theirs, false) {
                record(ledger, "detach input queues", &e);
            }
        }
        debug!("focus released");
    }
}

impl Drop for FocusStealer<'_> {
    fn drop(&mut self) {
        if !self.released {
            warn!("focus stealer dropped without release");
            self.release(&mut FailureLedger::new());
        }
    }
}

fn record(ledger: &mut FailureLedger, step: &str, error: &dyn std::error::Error) {
    warn!("{step} failed: {error}");
    ledger.recoverable(FailureKind::FocusOperation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::platform::{InputError, MockFocusControl, WindowHandle};
    use mockall::predicate::eq;
    use mockall::Sequence;

    const WINDOW: WindowHandle = WindowHandle(0xBEEF);
    const OURS: QueueId = QueueId(1);
    const THEIRS: QueueId = QueueId(2);

    fn failure() -> InputError {
        InputError::native("mock", "denied")
    }

    #[test]
    fn test_full_acquire_release_order() {
        // Arrange
        let mut control = MockFocusControl::new();
        let mut seq = Sequence::new();
        control
            .expect_foreground_window()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Some((WINDOW, THEIRS)));
        control
            .expect_current_queue()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(OURS);
        control
            .expect_attach_input_queues()
            .with(eq(OURS), eq(THEIRS), eq(true))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        control
            .expect_bring_to_front_and_focus()
            .with(eq(WINDOW))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        control
            .expect_block_other_input()
            .with(eq(true))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        control
            .expect_block_other_input()
            .with(eq(false))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        control
            .expect_attach_input_queues()
            .with(eq(OURS), eq(THEIRS), eq(false))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        let mut ledger = FailureLedger::new();

        // Act
        let mut stealer = FocusStealer::acquire(&control, &mut ledger);
        assert_eq!(stealer.owner_queue(), Some(THEIRS));
        stealer.release(&mut ledger);
        stealer.release(&mut ledger);
        drop(stealer);

        // Assert
        assert!(ledger.is_clean());
    }

    #[test]
    fn test_same_queue_is_not_attached() {
        let mut control = MockFocusControl::new();
        control.expect_foreground_window().returning(|| Some((WINDOW, OURS)));
        control.expect_current_queue().return_const(OURS);
        control.expect_attach_input_queues().times(0);
        control.expect_bring_to_front_and_focus().returning(|_| Ok(()));
        control.expect_block_other_input().times(2).returning(|_| Ok(()));
        let mut ledger = FailureLedger::new();

        let mut stealer = FocusStealer::acquire(&control, &mut ledger);
        stealer.release(&mut ledger);

        assert!(ledger.is_clean());
    }

    #[test]
    fn test_failed_steps_are_recorded_and_not_undone() {
        // Arrange
        let mut control = MockFocusControl::new();
        control.expect_foreground_window().returning(|| Some((WINDOW, THEIRS)));
        control.expect_current_queue().return_const(OURS);
        control
            .expect_attach_input_queues()
            .times(1)
            .returning(|_, _, _| Err(failure()));
        control
            .expect_bring_to_front_and_focus()
            .returning(|_| Err(failure()));
        control
            .expect_block_other_input()
            .with(eq(true))
            .times(1)
            .returning(|_| Err(failure()));
        let mut ledger = FailureLedger::new();

        // Act
        let mut stealer = FocusStealer::acquire(&control, &mut ledger);
        stealer.release(&mut ledger);

        // Assert
        assert_eq!(ledger.count(FailureKind::FocusOperation), 3);
        assert_eq!(ledger.fatal_kind(), None);
    }

    #[test]
    fn test_missing_foreground_window_still_blocks_input() {
        let mut control = MockFocusControl::new();
        control.expect_foreground_window().returning(|| None);
        control.expect_block_other_input().times(2).returning(|_| Ok(()));
        let mut ledger = FailureLedger::new();

        let mut stealer = FocusStealer::acquire(&control, &mut ledger);
        stealer.release(&mut ledger);

        assert_eq!(stealer.owner_queue(), None);
        assert_eq!(ledger.count(FailureKind::FocusOperation), 1);
    }

    #[test]
    fn test_drop_releases_when_release_was_skipped() {
        let mut control = MockFocusControl::new();
        control.expect_foreground_window().returning(|| None);
        control.expect_block_other_input().with(eq(true)).times(1).returning(|_| Ok(()));
        control.expect_block_other_input().with(eq(false)).times(1).returning(|_| Ok(()));
        let mut ledger = FailureLedger::new();

        let stealer = FocusStealer::acquire(&control, &mut ledger);
        drop(stealer);
    }
}
