//! Simulated commander.
//!
//! Stands in for the remote device-command service when the bridge runs
//! against the in-process broker: consumes the command topic and answers
//! each request on the response topic with a correlated acknowledgment.

use core::time::Duration;
use std::thread::{self, JoinHandle};

use log::{info, warn};

use crate::app::commands::{CommandRequest, CommandResponse, METHOD_CALL, OutboundMessage};
use crate::app::ports::{BrokerError, Delivery, MessageBroker, PublishChannel, SubscribeChannel};
use crate::config::BrokerConfig;
use crate::scheduler::StopSignal;

use super::memory_broker::MemoryBroker;

const POLL: Duration = Duration::from_millis(200);
const GROUP_ID: &str = "uacommander-sim";

/// Build the acknowledgment for one command payload.  `None` if the
/// payload is not a command request.
pub fn respond(payload: &[u8]) -> Option<CommandResponse> {
    let request: CommandRequest = serde_json::from_slice(payload).ok()?;
    let (success, status) = if request.command() == METHOD_CALL {
        (true, format!("Good: {} called on {}", request.method_id(), request.endpoint()))
    } else {
        (false, format!("BadNotSupported: '{}'", request.command()))
    };
    Some(CommandResponse {
        correlation_id: request.correlation_id(),
        success,
        status,
    })
}

/// Background thread answering commands until stopped.
pub struct SimulatedCommander {
    handle: JoinHandle<()>,
}

impl SimulatedCommander {
    pub fn spawn(broker: MemoryBroker, config: BrokerConfig, stop: StopSignal) -> Result<Self, BrokerError> {
        warn!(
            "Commander: SIMULATED on the in-process broker; commander reachability reflects the simulation, not a real peer"
        );
        let mut broker = broker;
        let mut inbox = broker.open_subscriber(&config, &config.topic, GROUP_ID)?;
        let mut outbox = broker.open_publisher(&config)?;

        let handle = thread::Builder::new()
            .name("commander-sim".into())
            .spawn(move || {
                info!("Commander: listening on '{}'", config.topic);
                while !stop.is_stopped() {
                    let payload = match inbox.receive(POLL) {
                        Ok(Delivery::Message(payload)) => payload,
                        Ok(Delivery::TimedOut) => continue,
                        Err(e) => {
                            warn!("Commander: receive failed: {}", e);
                            stop.wait_timeout(POLL);
                            continue;
                        }
                    };
                    let Some(response) = respond(&payload) else {
                        warn!("Commander: ignoring non-command message");
                        continue;
                    };
                    let Ok(body) = serde_json::to_vec(&response) else {
                        continue;
                    };
                    let message = OutboundMessage {
                        headers: Vec::new(),
                        payload: body,
                    };
                    match outbox.publish(&config.response_topic, &message, POLL) {
                        Ok(()) => info!("Commander: answered {}", response.correlation_id),
                        Err(e) => warn!("Commander: reply failed: {}", e),
                    }
                }
                info!("Commander: stopped");
            })
            .map_err(|e| BrokerError::Transport(format!("spawn commander: {}", e)))?;

        Ok(Self { handle })
    }

    /// Wait for the thread to exit.  Call after stopping its signal.
    pub fn join(self) {
        if self.handle.join().is_err() {
            warn!("Commander: thread panicked");
        }
    }
}
