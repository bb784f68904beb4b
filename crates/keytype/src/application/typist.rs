//! Public typing API.
//!
//! [`Typist::type_string`] runs one complete typing call:
//!
//! ```text
//! type_string()
//!  ├─ reject over-long input            (LimitExceeded, no key events)
//!  ├─ wait for any running session
//!  ├─ supervisor task (owns the session slot)
//!  │   ├─ blocking worker
//!  │   │   ├─ FocusStealer::acquire     (platforms with focus control)
//!  │   │   ├─ TypingSession::run
//!  │   │   └─ FocusStealer::release
//!  │   └─ CancellationGuard::supervise  (timeout / request_abort)
//!  └─ aggregated result
//! ```
//!
//! The supervisor outlives the call.  Dropping a pending `type_string`
//! future stops the session at its next character, and the slot is held
//! until the worker has released its keys.

use std::sync::Arc;
use std::time::Duration;

use keytype_core::{FailureKind, FailureLedger, KeyDirection, KeyId, ModifierMask, TypingError, TypingOptions};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use super::focus::FocusStealer;
use super::guard::{ledger_from, AbortRegistry, CancellationGuard, DEFAULT_WIND_DOWN_GRACE};
use super::platform::{InputError, PlatformInput};
use super::session::{CancelToken, TypingSession};

pub struct Typist {
    platform: Arc<dyn PlatformInput>,
    registry: Arc<AbortRegistry>,
    grace: Duration,
}

impl Typist {
    /// A typist whose sessions can be aborted with the free
    /// [`request_abort`] function.
    pub fn new(platform: Arc<dyn PlatformInput>) -> Self {
        Self::with_registry(platform, AbortRegistry::global())
    }

    /// A typist using its own abort registry, independent of the global one.
    pub fn with_registry(platform: Arc<dyn PlatformInput>, registry: Arc<AbortRegistry>) -> Self {
        Self {
            platform,
            registry,
            grace: DEFAULT_WIND_DOWN_GRACE,
        }
    }

    /// How long a timed-out or aborted session may take to finish its
    /// current character before the call returns without it.
    pub fn with_wind_down_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Types `text` into the focused window.
    ///
    /// Sessions are serialized: a second call waits for the first to finish.
    ///
    /// # Errors
    ///
    /// Returns a [`TypingError`] listing every failure kind recorded during
    /// the call with its count.  [`FailureKind::LimitExceeded`] is reported
    /// before any key is touched.
    pub async fn type_string(&self, text: &str, options: &TypingOptions) -> Result<(), TypingError> {
        if text.is_empty() {
            return Ok(());
        }
        let characters = text.chars().count();
        if characters > options.max_characters {
            warn!(characters, max = options.max_characters, "input over character limit");
            return Err(TypingError::fatal(FailureKind::LimitExceeded));
        }

        let session_slot = self.registry.begin_session().await;
        info!(characters, platform = self.platform.name(), "typing started");

        let token = CancelToken::new();
        let supervisor = tokio::spawn(supervise_session(
            SessionPlan {
                platform: Arc::clone(&self.platform),
                registry: Arc::clone(&self.registry),
                options: options.clone(),
                text: text.to_owned(),
                grace: self.grace,
            },
            token.clone(),
            session_slot,
        ));
        let mut stop_on_drop = StopOnDrop {
            token,
            finished: false,
        };
        let ledger = ledger_from(supervisor.await);
        stop_on_drop.finished = true;

        let outcome = ledger.into_result();
        match &outcome {
            Ok(()) => info!(characters, "typing finished"),
            Err(e) => warn!(characters, "typing finished with errors: {e}"),
        }
        outcome
    }

    /// Fires the abort signal of the session this typist's registry is
    /// running.  Returns `false` when there is nothing to abort.
    pub fn request_abort(&self) -> bool {
        self.registry.request_abort()
    }

    /// Presses `key` with no modifier flags.
    pub fn press(&self, key: KeyId) -> Result<(), InputError> {
        self.platform
            .inject_key_event(key, KeyDirection::Down, ModifierMask::empty())
    }

    pub fn release(&self, key: KeyId) -> Result<(), InputError> {
        self.platform
            .inject_key_event(key, KeyDirection::Up, ModifierMask::empty())
    }

    /// Presses `key`, holds it for `hold`, and releases it.
    ///
    /// The release is sent even when the press failed; the first error is
    /// returned.
    pub async fn tap(&self, key: KeyId, hold: Duration) -> Result<(), InputError> {
        let pressed = self.press(key);
        tokio::time::sleep(hold).await;
        let released = self.release(key);
        pressed.and(released)
    }

    /// Whether `key` is physically down.  On Windows `key` is a virtual-key
    /// code; elsewhere it is the same identifier used for events.
    pub fn key_is_down(&self, key: KeyId) -> bool {
        self.platform.key_is_down(key)
    }
}

/// Everything a supervisor task needs to run one session on its own.
struct SessionPlan {
    platform: Arc<dyn PlatformInput>,
    registry: Arc<AbortRegistry>,
    options: TypingOptions,
    text: String,
    grace: Duration,
}

/// Cancels the session if the awaiting call goes away first.
struct StopOnDrop {
    token: CancelToken,
    finished: bool,
}

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        if !self.finished {
            debug!("typing call dropped, stopping session");
            self.token.cancel();
        }
    }
}

/// Runs the worker under the guard and releases `session_slot` once no
/// thread is typing any more.
async fn supervise_session(
    plan: SessionPlan,
    token: CancelToken,
    session_slot: OwnedMutexGuard<()>,
) -> FailureLedger {
    let SessionPlan {
        platform,
        registry,
        options,
        text,
        grace,
    } = plan;

    let abort = registry.arm();
    let worker = {
        let options = options.clone();
        let token = token.clone();
        tokio::task::spawn_blocking(move || run_focused(platform, options, token, &text))
    };

    let supervised = CancellationGuard::new(options.timeout)
        .with_grace(grace)
        .supervise(worker, &token, abort)
        .await;
    registry.disarm();

    match supervised.straggler {
        // Keep later sessions out until the stray worker has released
        // its modifiers and the focus.
        Some(worker) => {
            tokio::spawn(async move {
                let _ = worker.await;
                drop(session_slot);
            });
        }
        None => drop(session_slot),
    }
    supervised.ledger
}

/// Runs one session between focus acquisition and release.
///
/// Everything happens on the calling (blocking) thread: Windows only lets
/// the thread that blocked input unblock it, and the attached input queue is
/// this thread's.
fn run_focused(
    platform: Arc<dyn PlatformInput>,
    options: TypingOptions,
    token: CancelToken,
    text: &str,
) -> FailureLedger {
    let mut focus_ledger = FailureLedger::new();
    let mut focus = platform
        .focus_control()
        .map(|control| FocusStealer::acquire(control, &mut focus_ledger));
    let owner = focus.as_ref().and_then(FocusStealer::owner_queue);
    let layout = platform.keyboard_layout(owner);
    debug!(layout = layout.0, "keyboard layout selected");

    let session = TypingSession::new(Arc::clone(&platform), options, layout, token);
    let mut ledger = session.run(text);

    if let Some(stealer) = focus.as_mut() {
        stealer.release(&mut focus_ledger);
    }
    ledger.merge(focus_ledger);
    ledger
}

/// Aborts the session started through any [`Typist::new`] typist.
///
/// A no-op returning `false` when no such session is running or its abort
/// signal was already used.
pub fn request_abort() -> bool {
    AbortRegistry::global().request_abort()
}
