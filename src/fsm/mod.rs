//! Cycle phase tracker.
//!
//! One cycle walks a fixed path through these phases:
//!
//! ```text
//!            ┌──────────┐ threshold not met ┌──────────┐
//!   Idle ───▶│ Querying │──────────────────▶│ NoAction │───▶ Idle
//!            └────┬─────┘                   └──────────┘
//!                 │ threshold met
//!                 ▼
//!           ┌─────────────┐ publish acked ┌─────────────┐
//!           │ Dispatching │──────────────▶│ Correlating │───▶ Idle
//!           └─────────────┘               └─────────────┘
//!
//!   any phase ──(error)──▶ Idle
//! ```
//!
//! The tracker does not drive the cycle; [`BridgeService`] does.  It
//! checks each requested move against the table in [`states`], logs it,
//! and emits a [`BridgeEvent::PhaseChanged`].
//!
//! [`BridgeService`]: crate::app::service::BridgeService
//! [`BridgeEvent::PhaseChanged`]: crate::app::events::BridgeEvent::PhaseChanged

pub mod context;
pub mod states;

use log::{info, warn};

use crate::app::events::BridgeEvent;
use crate::app::ports::EventSink;

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

/// Enumeration of all cycle phases.
/// Must stay in sync with the table in [`states::TRANSITIONS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CyclePhase {
    Idle = 0,
    Querying = 1,
    NoAction = 2,
    Dispatching = 3,
    Correlating = 4,
}

impl CyclePhase {
    pub const COUNT: usize = 5;

    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Querying => "Querying",
            Self::NoAction => "NoAction",
            Self::Dispatching => "Dispatching",
            Self::Correlating => "Correlating",
        }
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Tracks the current phase and counts transitions.
pub struct PhaseTracker {
    current: CyclePhase,
    transitions: u64,
    rejected: u64,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    pub const fn new() -> Self {
        Self {
            current: CyclePhase::Idle,
            transitions: 0,
            rejected: 0,
        }
    }

    pub const fn current(&self) -> CyclePhase {
        self.current
    }

    /// Total accepted transitions since construction.
    pub const fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Transitions refused because they are not in the table.
    pub const fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Move to `next` if the table allows it.  Returns whether it moved.
    pub fn advance(&mut self, next: CyclePhase, sink: &mut impl EventSink) -> bool {
        if !states::is_legal(self.current, next) {
            warn!(
                "Phase transition refused: {} -> {}",
                self.current.name(),
                next.name()
            );
            debug_assert!(false, "illegal phase transition {:?} -> {:?}", self.current, next);
            self.rejected += 1;
            return false;
        }
        self.transition(next, sink);
        true
    }

    /// Return to Idle from wherever the cycle stopped.  No-op when idle.
    pub fn return_to_idle(&mut self, sink: &mut impl EventSink) {
        if self.current != CyclePhase::Idle {
            self.transition(CyclePhase::Idle, sink);
        }
    }

    fn transition(&mut self, next: CyclePhase, sink: &mut impl EventSink) {
        info!("Phase transition: {} -> {}", self.current.name(), next.name());
        let from = self.current;
        self.current = next;
        self.transitions += 1;
        sink.emit(&BridgeEvent::PhaseChanged { from, to: next });
    }
}
