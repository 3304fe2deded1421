//! Application core: cycle orchestration with no direct I/O.
//!
//! This module contains the business rules of the bridge: one cycle of
//! query → evaluate → dispatch → correlate, and the bookkeeping around it.
//! All interaction with the telemetry store, the broker and the
//! configuration source happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without a network.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
