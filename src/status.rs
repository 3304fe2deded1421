//! Connection status board.
//!
//! The cycle runner is the only writer; any number of readers (the status
//! page, the periodic status log line) take whole snapshots.  The record
//! lives in a `Cell` behind an `embassy-sync` blocking mutex, so every
//! read and every write happens inside one critical section and a reader
//! can never observe a half-applied update.
//!
//! ```text
//!  BridgeService ──update──▶ ┌──────────────────────┐ ──snapshot──▶ status page
//!                            │ Mutex<Cell<Board>>   │
//!                            └──────────────────────┘ ──report────▶ STATUS log
//! ```

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use serde::Serialize;

use crate::app::events::CycleOutcome;

/// Reachability of every dependency, plus whether the loop runs at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    pub running: bool,
    pub query_store_reachable: bool,
    pub broker_reachable: bool,
    pub commander_reachable: bool,
}

impl ConnectionState {
    /// Same snapshot with every reachability flag cleared.
    pub const fn degraded(self) -> Self {
        Self {
            running: self.running,
            query_store_reachable: false,
            broker_reachable: false,
            commander_reachable: false,
        }
    }

    /// Human-readable running label shown on the status page.
    pub const fn status_label(&self) -> &'static str {
        if self.running { "Running" } else { "Not Running" }
    }
}

/// Per-outcome cycle counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    pub total: u64,
    pub no_action: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub aborted: u64,
    pub last_outcome: Option<&'static str>,
}

impl CycleStats {
    fn record(&mut self, outcome: &CycleOutcome) {
        self.total += 1;
        match outcome {
            CycleOutcome::NoAction => self.no_action += 1,
            CycleOutcome::Success { .. } => self.succeeded += 1,
            CycleOutcome::Failure { .. } => self.failed += 1,
            CycleOutcome::TimedOut => self.timed_out += 1,
            CycleOutcome::Aborted { .. } => self.aborted += 1,
        }
        self.last_outcome = Some(outcome.label());
    }
}

/// Read-only view handed to the status page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status: &'static str,
    pub connection_to_query_store: bool,
    pub connection_to_broker: bool,
    pub connection_to_commander: bool,
    pub cycles: CycleStats,
}

#[derive(Clone, Copy, Default)]
struct Board {
    connection: ConnectionState,
    stats: CycleStats,
}

/// Shared, single-writer status record.
pub struct StatusBoard {
    inner: Mutex<CriticalSectionRawMutex, Cell<Board>>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    /// Fresh board: not running, nothing reachable, no cycles.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(Board {
                connection: ConnectionState {
                    running: false,
                    query_store_reachable: false,
                    broker_reachable: false,
                    commander_reachable: false,
                },
                stats: CycleStats {
                    total: 0,
                    no_action: 0,
                    succeeded: 0,
                    failed: 0,
                    timed_out: 0,
                    aborted: 0,
                    last_outcome: None,
                },
            })),
        }
    }

    // ── Readers ───────────────────────────────────────────────

    pub fn snapshot(&self) -> ConnectionState {
        self.inner.lock(|cell| cell.get().connection)
    }

    pub fn stats(&self) -> CycleStats {
        self.inner.lock(|cell| cell.get().stats)
    }

    /// Connection snapshot and counters taken in the same critical section.
    pub fn report(&self) -> StatusReport {
        let board = self.inner.lock(Cell::get);
        StatusReport {
            status: board.connection.status_label(),
            connection_to_query_store: board.connection.query_store_reachable,
            connection_to_broker: board.connection.broker_reachable,
            connection_to_commander: board.connection.commander_reachable,
            cycles: board.stats,
        }
    }

    // ── Writer (cycle runner only) ────────────────────────────

    pub fn set_running(&self, running: bool) {
        self.update(|b| b.connection.running = running);
    }

    pub fn mark_query_store_reachable(&self) {
        self.update(|b| b.connection.query_store_reachable = true);
    }

    pub fn mark_broker_reachable(&self) {
        self.update(|b| b.connection.broker_reachable = true);
    }

    pub fn mark_commander_reachable(&self) {
        self.update(|b| b.connection.commander_reachable = true);
    }

    /// Clear all reachability flags at once.
    pub fn degrade(&self) {
        self.update(|b| b.connection = b.connection.degraded());
    }

    pub fn record_outcome(&self, outcome: &CycleOutcome) {
        self.update(|b| b.stats.record(outcome));
    }

    fn update(&self, f: impl FnOnce(&mut Board)) {
        self.inner.lock(|cell| {
            let mut board = cell.get();
            f(&mut board);
            cell.set(board);
        });
    }
}
