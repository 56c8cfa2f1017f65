//! Readiness event bus.
//!
//! A small set of named flags that producers raise and the aggregator waits
//! on. Waiting is always bounded; on wake the waiter can clear exactly the
//! bits it observed, leaving everything outside its mask alone.

use crate::types::{ReadyFlag, ReadySet};
use log::trace;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{Instant, timeout_at};

/// Condition a wait must satisfy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitMode {
    /// Every bit of the mask is set.
    All,
    /// At least one bit of the mask is set.
    Any,
}

/// Result of [`ReadinessEventBus::wait`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitOutcome {
    /// Bits of the mask that were set when the wait returned.
    /// Always a subset of the mask.
    pub observed: ReadySet,
    pub timed_out: bool,
}

impl WaitOutcome {
    #[inline]
    pub fn is_ready(&self) -> bool {
        !self.timed_out
    }
}

#[derive(Debug, Default)]
pub struct ReadinessEventBus {
    bits: Mutex<ReadySet>,
    changed: Notify,
}

impl ReadinessEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise a flag. Idempotent and never blocks on waiters.
    pub fn set(&self, flag: ReadyFlag) {
        let newly_set = {
            let mut bits = self.lock_bits();
            let was_set = bits.contains(flag);
            bits.insert(flag);
            !was_set
        };
        if newly_set {
            trace!("Readiness flag raised: {:?}", flag);
            self.changed.notify_waiters();
        }
    }

    /// Clear every flag in `mask`.
    pub fn clear(&self, mask: impl Into<ReadySet>) {
        self.lock_bits().remove_all(mask.into());
    }

    /// Current flags.
    pub fn snapshot(&self) -> ReadySet {
        *self.lock_bits()
    }

    /// Block until `mask` satisfies `mode` or `wait_timeout` elapses.
    ///
    /// The condition check and the optional clear happen under one lock, so
    /// the cleared bits are exactly the reported `observed` bits.
    pub async fn wait(
        &self,
        mask: impl Into<ReadySet>,
        mode: WaitMode,
        wait_timeout: Duration,
        clear_on_exit: bool,
    ) -> WaitOutcome {
        let mask = mask.into();
        let deadline = Instant::now() + wait_timeout;

        loop {
            // Register before checking so a set() between the check and the
            // await is not lost.
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(observed) = self.try_take(mask, mode, clear_on_exit) {
                return WaitOutcome {
                    observed,
                    timed_out: false,
                };
            }

            if timeout_at(deadline, notified).await.is_err() {
                // One last look: the deadline may race a set().
                if let Some(observed) = self.try_take(mask, mode, clear_on_exit) {
                    return WaitOutcome {
                        observed,
                        timed_out: false,
                    };
                }
                return WaitOutcome {
                    observed: self.snapshot().intersection(mask),
                    timed_out: true,
                };
            }
        }
    }

    fn try_take(&self, mask: ReadySet, mode: WaitMode, clear_on_exit: bool) -> Option<ReadySet> {
        let mut bits = self.lock_bits();
        let observed = bits.intersection(mask);
        let satisfied = match mode {
            WaitMode::All => bits.is_superset(mask),
            WaitMode::Any => !observed.is_empty(),
        };
        if !satisfied {
            return None;
        }
        if clear_on_exit {
            bits.remove_all(observed);
        }
        Some(observed)
    }

    fn lock_bits(&self) -> MutexGuard<'_, ReadySet> {
        // A set of bits cannot be left half-updated; recover from poisoning.
        self.bits.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
