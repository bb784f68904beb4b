//! Failure bookkeeping for one `type_string` call.
//!
//! A typing session keeps going after most failures: a rejected key event or
//! a skipped character is counted and the loop moves on.  Some failures end
//! the call instead (limit exceeded, timeout, abort).  [`FailureLedger`]
//! tracks both; [`FailureLedger::into_result`] turns it into the single
//! [`TypingError`] the caller sees.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use tracing::warn;

/// Every way a `type_string` call can go wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    UnmappedCharacter,
    LimitExceeded,
    Timeout,
    Aborted,
    Injection,
    FocusOperation,
    /// The session worker panicked or was cancelled by the runtime.
    Internal,
}

impl FailureKind {
    pub fn description(self) -> &'static str {
        match self {
            FailureKind::UnmappedCharacter => "character has no key mapping",
            FailureKind::LimitExceeded => "input exceeds the character limit",
            FailureKind::Timeout => "timed out",
            FailureKind::Aborted => "aborted",
            FailureKind::Injection => "key injection failed",
            FailureKind::FocusOperation => "focus operation failed",
            FailureKind::Internal => "typing worker terminated unexpectedly",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Whether a failure stops the call or is only counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Recoverable,
}

/// Running record of failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureLedger {
    counts: BTreeMap<FailureKind, u32>,
    fatal: Option<FailureKind>,
}

impl FailureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure.  The first fatal failure recorded wins.
    pub fn record(&mut self, kind: FailureKind, severity: Severity) {
        match severity {
            Severity::Recoverable => {
                *self.counts.entry(kind).or_insert(0) += 1;
            }
            Severity::Fatal => {
                if self.fatal.is_none() {
                    self.fatal = Some(kind);
                }
            }
        }
    }

    pub fn recoverable(&mut self, kind: FailureKind) {
        self.record(kind, Severity::Recoverable);
    }

    pub fn fatal(&mut self, kind: FailureKind) {
        self.record(kind, Severity::Fatal);
    }

    /// Replaces whatever fatal failure was recorded.
    ///
    /// The cancellation guard uses this: once the deadline or an abort fires,
    /// that is the reason the call stopped, even if the session recorded its
    /// own fatal failure while winding down.
    pub fn override_fatal(&mut self, kind: FailureKind) {
        if let Some(previous) = self.fatal.replace(kind) {
            if previous != kind {
                warn!(%previous, replacement = %kind, "fatal failure superseded");
            }
        }
    }

    /// Folds `other` into `self`.  Counts add up; `self`'s fatal kind wins.
    pub fn merge(&mut self, other: FailureLedger) {
        for (kind, count) in other.counts {
            *self.counts.entry(kind).or_insert(0) += count;
        }
        if self.fatal.is_none() {
            self.fatal = other.fatal;
        }
    }

    pub fn is_clean(&self) -> bool {
        self.fatal.is_none() && self.counts.is_empty()
    }

    pub fn fatal_kind(&self) -> Option<FailureKind> {
        self.fatal
    }

    /// Occurrences of `kind`, counting a fatal failure once.
    pub fn count(&self, kind: FailureKind) -> u32 {
        let recoverable = self.counts.get(&kind).copied().unwrap_or(0);
        recoverable + u32::from(self.fatal == Some(kind))
    }

    /// `Ok(())` when nothing was recorded, the aggregated error otherwise.
    pub fn into_result(self) -> Result<(), TypingError> {
        if self.is_clean() {
            Ok(())
        } else {
            Err(TypingError { ledger: self })
        }
    }
}

/// Aggregated failure of a `type_string` call.
///
/// Lists every distinct failure kind with how often it occurred.  When the
/// call was stopped early the stopping reason comes first:
///
/// ```text
/// typing stopped: timed out; (x 2) key injection failed
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.render())]
pub struct TypingError {
    ledger: FailureLedger,
}

impl TypingError {
    /// An error carrying a single fatal failure.
    pub fn fatal(kind: FailureKind) -> Self {
        let mut ledger = FailureLedger::new();
        ledger.fatal(kind);
        Self { ledger }
    }

    /// The failure that stopped the call, if it was stopped.
    pub fn fatal_kind(&self) -> Option<FailureKind> {
        self.ledger.fatal
    }

    pub fn is_fatal(&self) -> bool {
        self.ledger.fatal.is_some()
    }

    pub fn count(&self, kind: FailureKind) -> u32 {
        self.ledger.count(kind)
    }

    fn render(&self) -> String {
        let fatal = self
            .ledger
            .fatal
            .map(|kind| format!("typing stopped: {kind}"));
        let counted = self
            .ledger
            .counts
            .iter()
            .map(|(kind, count)| format!("(x {count}) {kind}"));
        fatal.into_iter().chain(counted).collect::<Vec<_>>().join("; ")
    }
}
