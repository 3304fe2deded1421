//! Broker-facing half of the cycle.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  CommandDispatcher ──publish──▶ command topic ──▶ commander │
//! │                                                      │     │
//! │  ResponseCorrelator ◀──receive── response topic ◀────┘     │
//! │        │                                                   │
//! │        └──▶ inspect(): Matched | Mismatched | Unparseable  │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod correlator;
pub mod dispatcher;
pub mod inspect;

pub use correlator::{ResponseCorrelator, ResponseOutcome, Subscription};
pub use dispatcher::{CommandDispatcher, DispatchError};
pub use inspect::{Inspection, inspect};
