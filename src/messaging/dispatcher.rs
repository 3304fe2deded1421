//! Command dispatcher.
//!
//! Opens a publish channel for exactly one message, publishes the command
//! with a JSON content-type header, waits for the broker acknowledgment and
//! drops the channel.  Failures are not retried within the cycle.

use core::fmt;
use core::time::Duration;

use log::info;

use crate::app::commands::CommandRequest;
use crate::app::ports::{BrokerError, MessageBroker, PublishChannel};
use crate::config::BrokerConfig;
use crate::fsm::context::CycleBudget;
use crate::status::StatusBoard;

/// Single "dispatch failed" condition, with the underlying cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The request could not be serialized.
    Encode(String),
    /// The publish channel could not be opened.
    Connect(BrokerError),
    /// The broker did not acknowledge the message.
    Publish(BrokerError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(msg) => write!(f, "dispatch failed: encode: {}", msg),
            Self::Connect(e) => write!(f, "dispatch failed: connect: {}", e),
            Self::Publish(e) => write!(f, "dispatch failed: publish: {}", e),
        }
    }
}

/// Publishes method calls to the outbound topic.
pub struct CommandDispatcher<'a> {
    config: &'a BrokerConfig,
    publish_timeout: Duration,
}

impl<'a> CommandDispatcher<'a> {
    pub const fn new(config: &'a BrokerConfig, publish_timeout: Duration) -> Self {
        Self {
            config,
            publish_timeout,
        }
    }

    /// Publish `request` and wait for the acknowledgment.  Marks the broker
    /// reachable once the broker has acknowledged.
    pub fn dispatch<B: MessageBroker>(
        &self,
        broker: &mut B,
        request: &CommandRequest,
        budget: &CycleBudget,
        status: &StatusBoard,
    ) -> Result<(), DispatchError> {
        let message = request
            .to_message()
            .map_err(|e| DispatchError::Encode(e.to_string()))?;

        let mut publisher = broker
            .open_publisher(self.config)
            .map_err(DispatchError::Connect)?;

        let timeout = budget.cap(self.publish_timeout);
        if timeout.is_zero() {
            return Err(DispatchError::Publish(BrokerError::Timeout));
        }
        publisher
            .publish(&self.config.topic, &message, timeout)
            .map_err(DispatchError::Publish)?;

        status.mark_broker_reachable();
        info!(
            "Dispatch: command {} acknowledged on '{}'",
            request.correlation_id(),
            self.config.topic
        );
        Ok(())
    }
}
