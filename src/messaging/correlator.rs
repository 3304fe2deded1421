//! Response correlator.
//!
//! Waits on the response topic for the acknowledgment carrying the
//! outstanding correlation id.
//!
//! ```text
//!   receive(wait) ──▶ TimedOut ───────────────────────────▶ TimedOut
//!        │
//!        └─▶ Message ─▶ inspect ─┬─ Unparseable ─▶ discard, wait again (full wait)
//!                                ├─ Mismatched ──▶ mark commander reachable,
//!                                │                 discard, wait again (full wait)
//!                                └─ Matched ─────▶ mark commander reachable,
//!                                                  Success / Failure
//! ```
//!
//! Each wait is the configured response timeout clipped to the cycle
//! budget, so discarded traffic restarts the wait but can never keep the
//! cycle alive past its ceiling.

use core::time::Duration;

use log::{debug, info, warn};
use uuid::Uuid;

use crate::app::events::{BridgeEvent, CycleOutcome, DiscardReason};
use crate::app::ports::{BrokerError, Delivery, EventSink, MessageBroker, SubscribeChannel};
use crate::config::BrokerConfig;
use crate::fsm::context::CycleBudget;
use crate::status::StatusBoard;

use super::inspect::{Inspection, inspect};

/// How the wait for one command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    Success { status: String },
    Failure { status: String },
    TimedOut,
}

impl From<ResponseOutcome> for CycleOutcome {
    fn from(outcome: ResponseOutcome) -> Self {
        match outcome {
            ResponseOutcome::Success { status } => Self::Success { status },
            ResponseOutcome::Failure { status } => Self::Failure { status },
            ResponseOutcome::TimedOut => Self::TimedOut,
        }
    }
}

/// A cycle-scoped consumer-group membership.  Leaves the group when
/// closed or dropped, whichever comes first.
pub struct Subscription<S: SubscribeChannel> {
    channel: S,
    group_id: String,
    active: bool,
}

impl<S: SubscribeChannel> Subscription<S> {
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Borrow the underlying channel.
    pub const fn channel(&self) -> &S {
        &self.channel
    }

    pub fn close(&mut self) {
        if self.active {
            self.channel.unsubscribe();
            self.active = false;
            debug!("Correlator: left group {}", self.group_id);
        }
    }
}

impl<S: SubscribeChannel> Drop for Subscription<S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Waits for correlated responses.
pub struct ResponseCorrelator {
    response_timeout: Duration,
}

impl ResponseCorrelator {
    pub const fn new(response_timeout: Duration) -> Self {
        Self { response_timeout }
    }

    /// Join the response topic under a fresh group id.  A new group starts
    /// at the topic's end, so responses left over from earlier cycles are
    /// never read as current traffic.  Subscribe before publishing.
    pub fn subscribe<B: MessageBroker>(
        &self,
        broker: &mut B,
        config: &BrokerConfig,
    ) -> Result<Subscription<B::Subscriber>, BrokerError> {
        let group_id = Uuid::new_v4().to_string();
        let channel = broker.open_subscriber(config, &config.response_topic, &group_id)?;
        debug!(
            "Correlator: joined '{}' as group {}",
            config.response_topic, group_id
        );
        Ok(Subscription {
            channel,
            group_id,
            active: true,
        })
    }

    /// Wait for the response to `correlation_id`.  The subscription is
    /// closed before returning, whatever the result.
    pub fn await_response<S: SubscribeChannel>(
        &self,
        subscription: &mut Subscription<S>,
        correlation_id: Uuid,
        budget: &CycleBudget,
        status: &StatusBoard,
        sink: &mut impl EventSink,
    ) -> Result<ResponseOutcome, BrokerError> {
        let outcome = self.wait(subscription, correlation_id, budget, status, sink);
        subscription.close();
        outcome
    }

    fn wait<S: SubscribeChannel>(
        &self,
        subscription: &mut Subscription<S>,
        correlation_id: Uuid,
        budget: &CycleBudget,
        status: &StatusBoard,
        sink: &mut impl EventSink,
    ) -> Result<ResponseOutcome, BrokerError> {
        if !subscription.active {
            return Err(BrokerError::Closed);
        }

        loop {
            let wait = budget.cap(self.response_timeout);
            if wait.is_zero() {
                warn!("Correlator: cycle budget exhausted waiting for {}", correlation_id);
                return Ok(ResponseOutcome::TimedOut);
            }

            let payload = match subscription.channel.receive(wait)? {
                Delivery::Message(payload) => payload,
                Delivery::TimedOut => {
                    warn!(
                        "Correlator: no response for {} within {:?}",
                        correlation_id, wait
                    );
                    return Ok(ResponseOutcome::TimedOut);
                }
            };

            match inspect(&payload, correlation_id) {
                Inspection::Unparseable(reason) => {
                    debug!("Correlator: discarding unparseable message: {}", reason);
                    sink.emit(&BridgeEvent::ResponseDiscarded {
                        reason: DiscardReason::Unparseable(reason),
                    });
                }
                Inspection::Mismatched(response) => {
                    status.mark_commander_reachable();
                    debug!(
                        "Correlator: discarding response for {} (waiting for {})",
                        response.correlation_id, correlation_id
                    );
                    sink.emit(&BridgeEvent::ResponseDiscarded {
                        reason: DiscardReason::Mismatched(response.correlation_id),
                    });
                }
                Inspection::Matched(response) => {
                    status.mark_commander_reachable();
                    info!(
                        "Correlator: response for {} success={} status='{}'",
                        correlation_id, response.success, response.status
                    );
                    return Ok(if response.success {
                        ResponseOutcome::Success {
                            status: response.status,
                        }
                    } else {
                        ResponseOutcome::Failure {
                            status: response.status,
                        }
                    });
                }
            }
        }
    }
}
