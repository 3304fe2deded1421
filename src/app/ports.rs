//! Port traits: the hexagonal boundary between the cycle core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ BridgeService (domain)
//! ```
//!
//! Driven adapters (configuration sources, the telemetry store, the message
//! broker, event sinks) implement these traits.  The
//! [`BridgeService`](super::service::BridgeService) consumes them via
//! generics, so the core never touches HTTP or broker sockets directly.
//!
//! ## Resource model
//!
//! Every connection handed out by a port (`QueryClient`, `PublishChannel`,
//! `SubscribeChannel`) is **ephemeral**: it is opened inside one cycle and
//! released when dropped.  Implementations MUST release sockets and
//! consumer-group membership in `Drop`, because that is the only release
//! path the core relies on.
//!
//! ## Waiting
//!
//! Every blocking call takes an explicit timeout.  Completion, timeout and
//! failure are distinguishable: `Ok(..)`, `Ok(Delivery::TimedOut)` /
//! `Err(..::Timeout)`, and `Err(..)` respectively.

use core::time::Duration;

use crate::app::commands::OutboundMessage;
use crate::config::{BridgeConfig, BrokerConfig, IdentityConfig, StoreConfig};
use crate::telemetry::row::RawRow;

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: environment / file → domain)
// ───────────────────────────────────────────────────────────────

/// Resolves the bridge configuration.  Called once per cycle, so a source
/// may pick up changes between cycles.
pub trait ConfigPort {
    fn load(&self) -> Result<BridgeConfig, ConfigError>;
}

impl<T: ConfigPort + ?Sized> ConfigPort for Box<T> {
    fn load(&self) -> Result<BridgeConfig, ConfigError> {
        (**self).load()
    }
}

// ───────────────────────────────────────────────────────────────
// Telemetry store port (driven adapter: domain → analytical store)
// ───────────────────────────────────────────────────────────────

/// Factory for per-cycle query clients.
pub trait TelemetryStore {
    type Client: QueryClient;

    /// Create an authenticated client.  Success here is what marks the
    /// store as reachable, regardless of what later queries return.
    fn open(
        &mut self,
        identity: &IdentityConfig,
        store: &StoreConfig,
        timeout: Duration,
    ) -> Result<Self::Client, QueryError>;
}

/// One authenticated session against the telemetry store.
pub trait QueryClient {
    /// Run a complete query expression and return its primary result rows.
    fn execute(&mut self, query: &str, timeout: Duration) -> Result<Vec<RawRow>, QueryError>;
}

// ───────────────────────────────────────────────────────────────
// Message broker port (driven adapter: domain ↔ message bus)
// ───────────────────────────────────────────────────────────────

/// Factory for per-cycle broker channels.
pub trait MessageBroker {
    type Publisher: PublishChannel;
    type Subscriber: SubscribeChannel;

    /// Open an authenticated publish channel.
    fn open_publisher(&mut self, config: &BrokerConfig) -> Result<Self::Publisher, BrokerError>;

    /// Join consumer group `group_id` on `topic`.  A group the broker has
    /// never seen starts at the end of the topic, so it only reads messages
    /// appended after it joined.
    fn open_subscriber(
        &mut self,
        config: &BrokerConfig,
        topic: &str,
        group_id: &str,
    ) -> Result<Self::Subscriber, BrokerError>;
}

/// Write side of the broker.
pub trait PublishChannel {
    /// Publish and block until the broker acknowledges, or `timeout` passes
    /// (reported as [`BrokerError::Timeout`]).
    fn publish(
        &mut self,
        topic: &str,
        message: &OutboundMessage,
        timeout: Duration,
    ) -> Result<(), BrokerError>;
}

/// Read side of the broker.
pub trait SubscribeChannel {
    /// Block for the next message up to `timeout`.
    fn receive(&mut self, timeout: Duration) -> Result<Delivery, BrokerError>;

    /// Leave the consumer group.  Must be idempotent.
    fn unsubscribe(&mut self);
}

/// Result of a single bounded receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Raw message payload.
    Message(Vec<u8>),
    /// Nothing arrived before the timeout.
    TimedOut,
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`BridgeEvent`](super::events::BridgeEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::BridgeEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is absent.  Carries the setting name.
    Missing(&'static str),
    /// A setting is present but out of range or inconsistent.
    ValidationFailed(&'static str),
    /// The source could not be parsed.
    Parse(String),
    /// The source could not be read.
    Io(String),
}

/// Errors from [`TelemetryStore`] and [`QueryClient`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Token acquisition or credential check failed.
    Auth(String),
    /// The store could not be reached.
    Unreachable(String),
    /// The store answered with a non-success status.
    Rejected { status: u16, body: String },
    /// The response could not be interpreted.
    Malformed(String),
    /// No answer within the timeout.
    Timeout,
}

/// Errors from [`MessageBroker`] and its channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The bootstrap server could not be reached.
    Unreachable(String),
    /// SASL authentication was refused.
    Auth(String),
    /// No acknowledgment within the timeout.
    Timeout,
    /// The channel was used after it was closed.
    Closed,
    /// Any other transport failure.
    Transport(String),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "missing setting {}", name),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Parse(msg) => write!(f, "parse error: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl core::fmt::Display for QueryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Auth(msg) => write!(f, "authentication failed: {}", msg),
            Self::Unreachable(msg) => write!(f, "unreachable: {}", msg),
            Self::Rejected { status, body } => write!(f, "rejected ({}): {}", status, body),
            Self::Malformed(msg) => write!(f, "malformed response: {}", msg),
            Self::Timeout => write!(f, "timed out"),
        }
    }
}

impl std::error::Error for QueryError {}

impl core::fmt::Display for BrokerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unreachable(server) => write!(f, "unreachable: {}", server),
            Self::Auth(msg) => write!(f, "authentication failed: {}", msg),
            Self::Timeout => write!(f, "timed out"),
            Self::Closed => write!(f, "channel closed"),
            Self::Transport(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

impl std::error::Error for BrokerError {}
