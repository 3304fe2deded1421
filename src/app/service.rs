//! Bridge service, the hexagonal core.
//!
//! [`BridgeService`] runs one cycle at a time against ports injected at
//! the call site, so the whole query → dispatch → correlate sequence is
//! testable with mock adapters.
//!
//! ```text
//!   ConfigPort ─────▶ ┌────────────────────────────┐ ──▶ EventSink
//!                     │        BridgeService       │
//! TelemetryStore ◀──▶ │ Gate · Evaluator · Phases  │ ──▶ StatusBoard
//!                     │ Dispatcher · Correlator    │
//!  MessageBroker ◀──▶ └────────────────────────────┘
//! ```
//!
//! Every connection opened during a cycle is owned by a local binding of
//! [`BridgeService::try_cycle`], so it is dropped (released) on every
//! return path: success, no action, early `?`, or unwinding panic.

use std::sync::Arc;

use log::{error, info, warn};

use crate::error::{Error, Result};
use crate::fsm::context::CycleBudget;
use crate::fsm::{CyclePhase, PhaseTracker};
use crate::messaging::{CommandDispatcher, ResponseCorrelator};
use crate::status::StatusBoard;
use crate::telemetry::{PressureQuery, TelemetryGate};
use crate::threshold::ThresholdEvaluator;

use super::commands::CommandRequest;
use super::events::{BridgeEvent, CycleOutcome};
use super::ports::{ConfigPort, EventSink, MessageBroker, TelemetryStore};

// ───────────────────────────────────────────────────────────────
// BridgeService
// ───────────────────────────────────────────────────────────────

/// Orchestrates cycles and keeps the status board current.
pub struct BridgeService {
    status: Arc<StatusBoard>,
    phase: PhaseTracker,
    cycle_count: u64,
    last_correlation_id: Option<uuid::Uuid>,
}

impl BridgeService {
    pub fn new(status: Arc<StatusBoard>) -> Self {
        Self {
            status,
            phase: PhaseTracker::new(),
            cycle_count: 0,
            last_correlation_id: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Mark the loop as running.
    pub fn start(&mut self) {
        self.status.set_running(true);
        info!("BridgeService started");
    }

    /// Mark the loop as stopped.
    pub fn stop(&mut self) {
        self.status.set_running(false);
        info!("BridgeService stopped after {} cycle(s)", self.cycle_count);
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Run one full cycle.  Never fails: every error becomes
    /// [`CycleOutcome::Aborted`] with a degraded status snapshot.
    pub fn run_cycle(
        &mut self,
        config: &impl ConfigPort,
        store: &mut impl TelemetryStore,
        broker: &mut impl MessageBroker,
        sink: &mut impl EventSink,
    ) -> CycleOutcome {
        self.cycle_count += 1;
        let cycle = self.cycle_count;
        sink.emit(&BridgeEvent::CycleStarted { cycle });

        let outcome = match self.try_cycle(config, store, broker, sink) {
            Ok(outcome) => outcome,
            Err(e) => self.degrade(&e),
        };
        self.finish(cycle, outcome, sink)
    }

    /// Close out a cycle that panicked before it could finish.
    pub fn abort_after_panic(&mut self, message: String, sink: &mut impl EventSink) -> CycleOutcome {
        let outcome = self.degrade(&Error::Panic(message));
        self.finish(self.cycle_count, outcome, sink)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self) -> &Arc<StatusBoard> {
        &self.status
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase.current()
    }

    /// Cycles started since construction.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Correlation id of the most recently built command, if any.
    pub fn last_correlation_id(&self) -> Option<uuid::Uuid> {
        self.last_correlation_id
    }

    // ── Internal ──────────────────────────────────────────────

    fn try_cycle(
        &mut self,
        config: &impl ConfigPort,
        store: &mut impl TelemetryStore,
        broker: &mut impl MessageBroker,
        sink: &mut impl EventSink,
    ) -> Result<CycleOutcome> {
        let config = config.load()?;
        config.validate()?;
        let timing = &config.timing;
        let budget = CycleBudget::new(timing.cycle_budget());

        // ── Querying ─────────────────────────────────────────
        self.phase.advance(CyclePhase::Querying, sink);
        let row = {
            let mut client =
                store.open(&config.identity, &config.store, budget.cap(timing.query_timeout()))?;
            self.status.mark_query_store_reachable();

            let query = PressureQuery::from_config(&config).to_kql();
            TelemetryGate::new(budget.cap(timing.query_timeout())).run_query(&mut client, &query)
        };
        sink.emit(&BridgeEvent::QueryCompleted { fields: row.len() });

        let evaluator = ThresholdEvaluator::new(config.rule.value_field.as_str());
        let Some(value) = evaluator.evaluate(&row) else {
            self.phase.advance(CyclePhase::NoAction, sink);
            return Ok(CycleOutcome::NoAction);
        };
        info!("High pressure detected: {}={}", evaluator.value_field(), value);
        sink.emit(&BridgeEvent::ConditionDetected { value });

        // ── Dispatching ──────────────────────────────────────
        self.phase.advance(CyclePhase::Dispatching, sink);
        let request = CommandRequest::method_call(&config.device);
        self.last_correlation_id = Some(request.correlation_id());

        let correlator = ResponseCorrelator::new(timing.response_timeout());
        let mut subscription = correlator.subscribe(broker, &config.broker)?;

        CommandDispatcher::new(&config.broker, timing.publish_timeout()).dispatch(
            broker,
            &request,
            &budget,
            &self.status,
        )?;
        sink.emit(&BridgeEvent::CommandSent {
            correlation_id: request.correlation_id(),
            payload: serde_json::to_string(&request).unwrap_or_default(),
        });

        // ── Correlating ──────────────────────────────────────
        self.phase.advance(CyclePhase::Correlating, sink);
        let outcome = correlator.await_response(
            &mut subscription,
            request.correlation_id(),
            &budget,
            &self.status,
            sink,
        )?;
        Ok(outcome.into())
    }

    fn degrade(&mut self, e: &Error) -> CycleOutcome {
        error!("Cycle {} aborted in {}: {}", self.cycle_count, self.phase.current().name(), e);
        self.status.degrade();
        CycleOutcome::Aborted {
            reason: e.to_string(),
        }
    }

    fn finish(&mut self, cycle: u64, outcome: CycleOutcome, sink: &mut impl EventSink) -> CycleOutcome {
        self.phase.return_to_idle(sink);
        self.status.record_outcome(&outcome);
        match &outcome {
            CycleOutcome::Aborted { .. } | CycleOutcome::TimedOut => {
                warn!("Cycle {}: {}", cycle, outcome);
            }
            _ => info!("Cycle {}: {}", cycle, outcome),
        }
        sink.emit(&BridgeEvent::CycleFinished {
            cycle,
            outcome: outcome.clone(),
        });
        outcome
    }
}
