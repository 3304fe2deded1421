//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each [`BridgeEvent`] as one tagged
//! line through the `log` facade.  Tags are fixed so the output can be
//! grepped per concern (`CYCLE |`, `QUERY |`, `DISPATCH |`, `RESPONSE |`).

use log::{debug, info, warn};

use crate::app::events::{BridgeEvent, CycleOutcome, DiscardReason};
use crate::app::ports::EventSink;

/// Adapter that logs every [`BridgeEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &BridgeEvent) {
        match event {
            BridgeEvent::CycleStarted { cycle } => {
                info!("CYCLE | #{} started", cycle);
            }
            BridgeEvent::PhaseChanged { from, to } => {
                debug!("CYCLE | {} -> {}", from.name(), to.name());
            }
            BridgeEvent::QueryCompleted { fields } => {
                info!("QUERY | returned {} field(s)", fields);
            }
            BridgeEvent::ConditionDetected { value } => {
                info!("QUERY | threshold exceeded, value={}", value);
            }
            BridgeEvent::CommandSent {
                correlation_id,
                payload,
            } => {
                info!("DISPATCH | id={} | {}", correlation_id, payload);
            }
            BridgeEvent::ResponseDiscarded { reason } => match reason {
                DiscardReason::Unparseable(why) => {
                    warn!("RESPONSE | discarded unparseable message: {}", why);
                }
                DiscardReason::Mismatched(id) => {
                    info!("RESPONSE | discarded response for other command {}", id);
                }
            },
            BridgeEvent::CycleFinished { cycle, outcome } => match outcome {
                CycleOutcome::Aborted { reason } => {
                    warn!("CYCLE | #{} aborted: {}", cycle, reason);
                }
                _ => info!("CYCLE | #{} finished: {}", cycle, outcome.label()),
            },
        }
    }
}
