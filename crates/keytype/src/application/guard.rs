//! Cancellation guard and the process-wide abort registry.
//!
//! The session runs on a blocking thread; its `JoinHandle` is the
//! single-result channel the guard waits on.  The guard races it against a
//! deadline and the abort signal:
//!
//! ```text
//! completion first  → the session's own ledger
//! deadline first    → Timeout, session told to stop at its next character
//! abort first       → Aborted, same cooperative stop
//! ```
//!
//! [`AbortRegistry`] owns the abort signal.  At rest there is none; one is
//! armed at session start and dropped at session end, and a request with no
//! armed signal does nothing.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use keytype_core::{FailureKind, FailureLedger};
use tokio::sync::{oneshot, OwnedMutexGuard};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, warn};

use super::session::CancelToken;

/// How long the guard waits for a stopped session to finish its current
/// character.
pub const DEFAULT_WIND_DOWN_GRACE: Duration = Duration::from_secs(1);

// ── Abort registry ────────────────────────────────────────────────────────────

/// Holds the abort signal of the running session, if any, and serializes
/// sessions.
#[derive(Debug, Default)]
pub struct AbortRegistry {
    slot: Mutex<Option<oneshot::Sender<()>>>,
    sessions: Arc<tokio::sync::Mutex<()>>,
}

static GLOBAL_REGISTRY: OnceLock<Arc<AbortRegistry>> = OnceLock::new();

impl AbortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry behind the free [`request_abort`](crate::request_abort).
    pub fn global() -> Arc<AbortRegistry> {
        Arc::clone(GLOBAL_REGISTRY.get_or_init(|| Arc::new(AbortRegistry::new())))
    }

    /// Waits until no other session is running and claims the slot.
    pub async fn begin_session(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.sessions).lock_owned().await
    }

    /// Creates a fresh abort signal for the current session.
    pub fn arm(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        if self.slot().replace(tx).is_some() {
            warn!("replaced an abort signal that was still armed");
        }
        rx
    }

    /// Drops the current signal without firing it.
    pub fn disarm(&self) {
        self.slot().take();
    }

    pub fn is_armed(&self) -> bool {
        self.slot().is_some()
    }

    /// Fires the current abort signal.
    ///
    /// Returns `false` when no session is running or its signal was already
    /// consumed.
    pub fn request_abort(&self) -> bool {
        match self.slot().take() {
            Some(tx) => {
                let delivered = tx.send(()).is_ok();
                debug!(delivered, "abort requested");
                delivered
            }
            None => {
                debug!("abort requested with no session running");
                false
            }
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<oneshot::Sender<()>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Guard ─────────────────────────────────────────────────────────────────────

/// Outcome of a supervised session.
#[derive(Debug)]
pub struct Supervised {
    pub ledger: FailureLedger,
    /// The session worker, when it did not stop within the grace period.
    pub straggler: Option<JoinHandle<FailureLedger>>,
}

#[derive(Debug, Clone, Copy)]
pub struct CancellationGuard {
    timeout: Duration,
    grace: Duration,
}

impl CancellationGuard {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            grace: DEFAULT_WIND_DOWN_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Waits for `worker`, the deadline or `abort`, whichever comes first.
    ///
    /// On deadline or abort the session is cancelled through `token` and
    /// given `grace` to finish its current character.  Its ledger is kept
    /// and the stopping reason overrides any fatal failure it recorded.
    pub async fn supervise(
        &self,
        mut worker: JoinHandle<FailureLedger>,
        token: &CancelToken,
        mut abort: oneshot::Receiver<()>,
    ) -> Supervised {
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);
        let mut abort_open = true;

        let stop = loop {
            tokio::select! {
                biased;
                joined = &mut worker => {
                    return Supervised { ledger: ledger_from(joined), straggler: None };
                }
                _ = &mut deadline => break FailureKind::Timeout,
                signal = &mut abort, if abort_open => match signal {
                    Ok(()) => break FailureKind::Aborted,
                    // Registry dropped the sender without firing.
                    Err(_) => abort_open = false,
                },
            }
        };

        debug!(reason = %stop, "stopping session");
        token.cancel();

        let (mut ledger, straggler) = match tokio::time::timeout(self.grace, &mut worker).await {
            Ok(joined) => (ledger_from(joined), None),
            Err(_) => {
                warn!(grace_ms = self.grace.as_millis() as u64, "session still running after grace period");
                (FailureLedger::new(), Some(worker))
            }
        };
        ledger.override_fatal(stop);
        Supervised { ledger, straggler }
    }
}

/// The ledger a joined task produced, or a fatal `Internal` if it panicked.
pub(crate) fn ledger_from(joined: Result<FailureLedger, JoinError>) -> FailureLedger {
    joined.unwrap_or_else(|e| {
        error!("typing worker failed: {e}");
        let mut ledger = FailureLedger::new();
        ledger.fatal(FailureKind::Internal);
        ledger
    })
}
