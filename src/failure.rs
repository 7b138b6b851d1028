//! Terminal outcome bookkeeping
//!
//! [`FailureClassifier`] holds the reason a run ended. Writers race (host
//! cancellation, connectivity loss, gate failure, engine failure), so the
//! last write before finalization wins. [`OutcomeCell`] is the
//! single-assignment flag guaranteeing one terminal notification per run.

use crate::types::FailureReason;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Last-writer-wins holder of the run's failure reason
#[derive(Debug, Default)]
pub struct FailureClassifier {
    reason: AtomicU8,
}

impl FailureClassifier {
    /// Classifier with no failure recorded
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `reason`, replacing whatever was recorded before
    pub fn record(&self, reason: FailureReason) {
        let previous = FailureReason::from_u8(self.reason.swap(reason.to_u8(), Ordering::SeqCst));
        if previous.is_failure() && previous != reason {
            tracing::debug!(%previous, %reason, "failure reason overwritten");
        }
    }

    /// Record `reason` only if nothing has been recorded yet
    ///
    /// Returns whether the reason was stored.
    pub fn record_if_unset(&self, reason: FailureReason) -> bool {
        self.reason
            .compare_exchange(
                FailureReason::None.to_u8(),
                reason.to_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Currently recorded reason
    pub fn current(&self) -> FailureReason {
        FailureReason::from_u8(self.reason.load(Ordering::SeqCst))
    }
}

/// Single-assignment "terminal notification posted" flag
#[derive(Debug, Default)]
pub struct OutcomeCell {
    posted: AtomicBool,
}

impl OutcomeCell {
    /// Unclaimed cell
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the right to post the terminal notification
    ///
    /// Exactly one caller ever gets `true`.
    pub fn try_claim(&self) -> bool {
        self.posted
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Whether the cell has been claimed
    pub fn is_claimed(&self) -> bool {
        self.posted.load(Ordering::SeqCst)
    }
}
