//! Cycle scheduler.
//!
//! Drives [`BridgeService::run_cycle`] forever at a fixed interval until a
//! [`StopSignal`] fires.  Nothing a cycle does can end the loop: errors are
//! already folded into outcomes by the service, and panics are caught here
//! and recorded as aborted cycles.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  start ─▶ wait(interval) ──stopped?──▶ yes ─▶ stop ─▶ return │
//! │              ▲                │                              │
//! │              │                no                             │
//! │              │                ▼                              │
//! │              └──────── run_once (catch_unwind)               │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use core::time::Duration;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use log::info;

use crate::app::events::CycleOutcome;
use crate::app::ports::{ConfigPort, EventSink, MessageBroker, TelemetryStore};
use crate::app::service::BridgeService;
use crate::diagnostics::panic_message;
use crate::status::StatusBoard;

// ═══════════════════════════════════════════════════════════════
//  Stop signal
// ═══════════════════════════════════════════════════════════════

/// Cloneable shutdown flag with an interruptible wait.
#[derive(Clone, Default)]
pub struct StopSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown and wake every waiter.
    pub fn stop(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep up to `timeout`.  Returns `true` if shutdown was requested
    /// before or during the wait.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

/// Owns the adapters and the service for the lifetime of the loop.
pub struct CycleScheduler<C, S, B, E> {
    interval: Duration,
    service: BridgeService,
    config: C,
    store: S,
    broker: B,
    sink: E,
}

impl<C, S, B, E> CycleScheduler<C, S, B, E>
where
    C: ConfigPort,
    S: TelemetryStore,
    B: MessageBroker,
    E: EventSink,
{
    pub fn new(
        interval: Duration,
        config: C,
        store: S,
        broker: B,
        sink: E,
        status: Arc<StatusBoard>,
    ) -> Self {
        Self {
            interval,
            service: BridgeService::new(status),
            config,
            store,
            broker,
            sink,
        }
    }

    /// Loop until `stop` fires.  The first cycle starts one interval after
    /// the call.
    pub fn run(&mut self, stop: &StopSignal) {
        self.service.start();
        info!("Scheduler: cycling every {:?}", self.interval);
        while !stop.wait_timeout(self.interval) {
            self.run_once();
        }
        self.service.stop();
    }

    /// Run a single cycle, converting a panic into an aborted outcome.
    pub fn run_once(&mut self) -> CycleOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.service
                .run_cycle(&self.config, &mut self.store, &mut self.broker, &mut self.sink)
        }));
        match result {
            Ok(outcome) => outcome,
            Err(payload) => self
                .service
                .abort_after_panic(panic_message(payload.as_ref()), &mut self.sink),
        }
    }

    pub fn service(&self) -> &BridgeService {
        &self.service
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }
}
