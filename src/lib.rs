//! Pressure-triggered method-call bridge.
//!
//! Every cycle queries the telemetry store for a recent pressure reading
//! above the threshold and, if one exists, publishes a `methodcall`
//! command for the configured OPC UA method and waits for the commander's
//! correlated acknowledgment.  All I/O sits behind the port traits in
//! [`app::ports`]; the adapters in [`adapters`] provide the concrete ones.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fsm;
pub mod messaging;
pub mod scheduler;
pub mod status;
pub mod telemetry;
pub mod threshold;
