//! Per-cycle time budget.
//!
//! Every blocking call in a cycle (token, query, publish ack, each receive)
//! asks the budget for its timeout.  The step gets its own configured
//! bound, clipped to whatever is left of the cycle, so the sum of all waits
//! can never exceed the cycle ceiling.

use core::time::Duration;
use std::time::Instant;

/// Deadline shared by all waits of one cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleBudget {
    started: Instant,
    deadline: Instant,
}

impl CycleBudget {
    /// Budget of `total` starting now.
    pub fn new(total: Duration) -> Self {
        Self::starting_at(Instant::now(), total)
    }

    pub fn starting_at(started: Instant, total: Duration) -> Self {
        Self {
            started,
            deadline: started + total,
        }
    }

    /// Time left before the deadline (zero once passed).
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Time since the cycle started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Timeout for a step whose own bound is `step`.
    pub fn cap(&self, step: Duration) -> Duration {
        step.min(self.remaining())
    }
}
