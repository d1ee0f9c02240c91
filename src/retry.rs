//! Retry budget for the top-stories request.
//!
//! Only failures to fetch the top-stories list count here. Everything that
//! goes wrong later in a cycle is logged and absorbed by the pipeline.

use tracing::{error, warn};

/// What the scheduler should do after a failed list fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryVerdict {
    /// Skip this cycle and try again on the next tick.
    Retry { remaining: u32 },
    /// The budget is spent; stop polling.
    Exhausted,
}

/// Counts consecutive list-fetch failures against a fixed budget.
#[derive(Debug, Clone)]
pub struct RetryGovernor {
    max: u32,
    remaining: u32,
}

impl RetryGovernor {
    pub fn new(max: u32) -> Self {
        Self {
            max,
            remaining: max,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Record a failed list fetch.
    pub fn record_failure(&mut self) -> RetryVerdict {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            error!(max = self.max, "Retries maxed out");
            RetryVerdict::Exhausted
        } else {
            warn!(
                remaining = self.remaining,
                max = self.max,
                "Top stories request failed; will retry next tick"
            );
            RetryVerdict::Retry {
                remaining: self.remaining,
            }
        }
    }

    /// Record a successful list fetch, restoring the full budget.
    pub fn reset(&mut self) {
        self.remaining = self.max;
    }
}
