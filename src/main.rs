//! uaaction: host entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  EnvConfigSource /   AdxTelemetryStore   MemoryBroker          │
//! │  FileConfigSource    (TelemetryStore)    (MessageBroker)       │
//! │  (ConfigPort)        LogEventSink        SimulatedCommander    │
//! │                      (EventSink)                               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          BridgeService (one cycle at a time)           │    │
//! │  │  Gate · Evaluator · Dispatcher · Correlator · Phases   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  "cycle" thread: CycleScheduler      main thread: status line  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `uaaction [config.toml]`.  Without an argument the
//! configuration is read from the environment.

use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use log::{info, warn};

use uaaction::adapters::adx::AdxTelemetryStore;
use uaaction::adapters::commander_sim::SimulatedCommander;
use uaaction::adapters::config_source::{EnvConfigSource, FileConfigSource};
use uaaction::adapters::log_sink::LogEventSink;
use uaaction::adapters::memory_broker::MemoryBroker;
use uaaction::app::ports::ConfigPort;
use uaaction::config::TimingConfig;
use uaaction::diagnostics;
use uaaction::scheduler::{CycleScheduler, StopSignal};
use uaaction::status::StatusBoard;

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    diagnostics::install_panic_hook();

    info!("uaaction v{} starting", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration source ───────────────────────────────
    let source: Box<dyn ConfigPort + Send> = match std::env::args().nth(1) {
        Some(path) => {
            info!("Config: file {}", path);
            Box::new(FileConfigSource::new(path))
        }
        None => {
            info!("Config: environment");
            Box::new(EnvConfigSource::new())
        }
    };

    // The interval is fixed at startup; everything else is re-read per cycle.
    let initial = source.load();
    let interval = initial
        .as_ref()
        .map_or_else(|_| TimingConfig::default().cycle_interval(), |c| c.timing.cycle_interval());
    if let Err(e) = &initial {
        warn!("Config: not usable yet ({}); cycles will abort until it is", e);
    }

    // ── 3. Broker and commander ───────────────────────────────
    let broker = MemoryBroker::new();
    let stop = StopSignal::new();
    let commander = match &initial {
        Ok(cfg) => Some(
            SimulatedCommander::spawn(broker.clone(), cfg.broker.clone(), stop.clone())
                .context("starting simulated commander")?,
        ),
        Err(_) => None,
    };

    // ── 4. Cycle thread ───────────────────────────────────────
    let status = Arc::new(StatusBoard::new());
    let cycle_stop = stop.clone();
    let cycle_status = Arc::clone(&status);
    let cycle = thread::Builder::new()
        .name("cycle".into())
        .spawn(move || {
            let mut scheduler = CycleScheduler::new(
                interval,
                source,
                AdxTelemetryStore::new(),
                broker,
                LogEventSink::new(),
                cycle_status,
            );
            scheduler.run(&cycle_stop);
        })
        .context("spawning cycle thread")?;

    // ── 5. Status reader ──────────────────────────────────────
    while !cycle.is_finished() {
        if stop.wait_timeout(interval) {
            break;
        }
        let report = status.report();
        info!(
            "STATUS | {} | store={} broker={} commander={} | cycles={} last={}",
            report.status,
            report.connection_to_query_store,
            report.connection_to_broker,
            report.connection_to_commander,
            report.cycles.total,
            report.cycles.last_outcome.unwrap_or("-"),
        );
    }

    stop.stop();
    if cycle.join().is_err() {
        warn!("Cycle thread panicked");
    }
    if let Some(commander) = commander {
        commander.join();
    }
    info!("uaaction stopped");
    Ok(())
}
