//! Unified error type for the action bridge.
//!
//! Every fallible step of a cycle funnels into [`Error`], so the cycle
//! runner has exactly one place where a failure turns into an aborted
//! cycle and a degraded connection snapshot.  The port-level error enums
//! live next to their traits in [`crate::app::ports`].

use core::fmt;

use crate::app::ports::{BrokerError, ConfigError, QueryError};
use crate::messaging::dispatcher::DispatchError;

// ---------------------------------------------------------------------------
// Top-level bridge error
// ---------------------------------------------------------------------------

/// Reasons a cycle can be aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Configuration could not be resolved or failed validation.
    Config(ConfigError),
    /// The telemetry store client could not be created (auth, endpoint).
    Query(QueryError),
    /// A broker channel could not be opened or broke mid-wait.
    Broker(BrokerError),
    /// The command could not be published.
    Dispatch(DispatchError),
    /// The cycle panicked; carries the panic message.
    Panic(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Query(e) => write!(f, "query store: {e}"),
            Self::Broker(e) => write!(f, "broker: {e}"),
            Self::Dispatch(e) => write!(f, "{e}"),
            Self::Panic(msg) => write!(f, "cycle panicked: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<QueryError> for Error {
    fn from(e: QueryError) -> Self {
        Self::Query(e)
    }
}

impl From<BrokerError> for Error {
    fn from(e: BrokerError) -> Self {
        Self::Broker(e)
    }
}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Bridge-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
