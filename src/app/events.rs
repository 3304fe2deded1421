//! Outbound application events.
//!
//! The [`BridgeService`](super::service::BridgeService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide where they go.

use serde_json::Value;
use uuid::Uuid;

use crate::fsm::CyclePhase;

/// Structured events emitted by the cycle core.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// A new cycle began (1-based counter).
    CycleStarted { cycle: u64 },

    /// The cycle moved between phases.
    PhaseChanged { from: CyclePhase, to: CyclePhase },

    /// The telemetry query returned; `fields` is the number of extracted columns.
    QueryCompleted { fields: usize },

    /// The threshold condition holds for `value`.
    ConditionDetected { value: Value },

    /// A command was published and acknowledged by the broker.
    CommandSent { correlation_id: Uuid, payload: String },

    /// An inbound message was dropped while waiting for the response.
    ResponseDiscarded { reason: DiscardReason },

    /// The cycle reached Idle again.
    CycleFinished { cycle: u64, outcome: CycleOutcome },
}

/// Why the correlator dropped an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// Not a valid response document.
    Unparseable(String),
    /// A valid response for some other command.
    Mismatched(Uuid),
}

/// Terminal result of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Threshold not met; nothing dispatched.
    NoAction,
    /// The commander executed the method.
    Success { status: String },
    /// The commander answered but the method failed.
    Failure { status: String },
    /// No correlated response inside the wait window.
    TimedOut,
    /// Something broke; reachability was forced to degraded.
    Aborted { reason: String },
}

impl CycleOutcome {
    /// Short stable label, used in statistics and log lines.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NoAction => "no-action",
            Self::Success { .. } => "success",
            Self::Failure { .. } => "failure",
            Self::TimedOut => "timed-out",
            Self::Aborted { .. } => "aborted",
        }
    }

    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

impl core::fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoAction => write!(f, "no action required"),
            Self::Success { status } => write!(f, "command successfully executed ({})", status),
            Self::Failure { status } => {
                write!(f, "response received but result is failure: {}", status)
            }
            Self::TimedOut => write!(f, "timeout waiting for response from commander"),
            Self::Aborted { reason } => write!(f, "cycle aborted: {}", reason),
        }
    }
}
