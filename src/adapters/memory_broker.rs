//! In-process message broker.
//!
//! Implements [`MessageBroker`] with retained, offset-addressed topic logs
//! and consumer groups, close enough to a partitioned log broker for the
//! bridge's needs:
//!
//! - a group seen for the first time starts at the topic's end (or at the
//!   earliest retained offset, see [`OffsetReset`]);
//! - each receive commits the group's offset;
//! - a group's offset is forgotten when its member leaves;
//! - publish blocks until acknowledged (or times out when acks are off);
//! - open channels are counted, so tests can assert that every cycle
//!   released what it opened.
//!
//! Clones share the same broker.

use core::time::Duration;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Instant;

use log::{debug, trace};

use crate::app::commands::OutboundMessage;
use crate::app::ports::{BrokerError, Delivery, MessageBroker, PublishChannel, SubscribeChannel};
use crate::config::BrokerConfig;

const DEFAULT_RETENTION: usize = 1024;

/// Where a consumer group seen for the first time starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetReset {
    /// Oldest retained message.  Replays the backlog.
    Earliest,
    /// End of the topic at join time.  Only messages appended afterwards.
    #[default]
    Latest,
}

#[derive(Default)]
struct TopicLog {
    /// Offset of `messages[0]`.
    base: usize,
    messages: VecDeque<OutboundMessage>,
}

impl TopicLog {
    fn end(&self) -> usize {
        self.base + self.messages.len()
    }
}

struct BrokerState {
    topics: HashMap<String, TopicLog>,
    /// Committed offset per (topic, group).
    groups: HashMap<(String, String), usize>,
    reachable: bool,
    acknowledging: bool,
    credentials: Option<(String, String)>,
    retention: usize,
    offset_reset: OffsetReset,
}

struct Shared {
    state: Mutex<BrokerState>,
    arrivals: Condvar,
    open_handles: AtomicUsize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_access(&self, config: &BrokerConfig) -> Result<(), BrokerError> {
        let state = self.lock();
        if !state.reachable {
            return Err(BrokerError::Unreachable(config.bootstrap_server()));
        }
        match &state.credentials {
            Some((user, pass)) if *user != config.username || *pass != config.password => {
                Err(BrokerError::Auth(format!("SASL PLAIN rejected for '{}'", config.username)))
            }
            _ => Ok(()),
        }
    }

    fn append(&self, topic: &str, message: OutboundMessage) -> usize {
        let mut state = self.lock();
        let retention = state.retention;
        let log = state.topics.entry(topic.to_string()).or_default();
        log.messages.push_back(message);
        while log.messages.len() > retention {
            log.messages.pop_front();
            log.base += 1;
        }
        let offset = log.end() - 1;
        drop(state);
        self.arrivals.notify_all();
        offset
    }
}

/// Shared handle to an in-process broker.
#[derive(Clone)]
pub struct MemoryBroker {
    shared: Arc<Shared>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    /// Reachable broker that accepts any credentials.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BrokerState {
                    topics: HashMap::new(),
                    groups: HashMap::new(),
                    reachable: true,
                    acknowledging: true,
                    credentials: None,
                    retention: DEFAULT_RETENTION,
                    offset_reset: OffsetReset::default(),
                }),
                arrivals: Condvar::new(),
                open_handles: AtomicUsize::new(0),
            }),
        }
    }

    /// Only accept channels opened with this username and password.
    pub fn with_credentials(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.shared.lock().credentials = Some((username.into(), password.into()));
        self
    }

    /// Keep at most `retention` messages per topic.
    pub fn with_retention(self, retention: usize) -> Self {
        self.shared.lock().retention = retention.max(1);
        self
    }

    /// Starting position for new consumer groups.
    pub fn with_offset_reset(self, reset: OffsetReset) -> Self {
        self.shared.lock().offset_reset = reset;
        self
    }

    /// Simulate the broker going away (or coming back).  Blocked receivers
    /// are woken and fail.
    pub fn set_reachable(&self, reachable: bool) {
        self.shared.lock().reachable = reachable;
        self.shared.arrivals.notify_all();
    }

    /// When off, publishes are never acknowledged and time out.
    pub fn set_acknowledging(&self, acknowledging: bool) {
        self.shared.lock().acknowledging = acknowledging;
    }

    /// Append a payload directly, bypassing any channel.  Returns its offset.
    pub fn publish_raw(&self, topic: &str, payload: impl Into<Vec<u8>>) -> usize {
        self.shared.append(
            topic,
            OutboundMessage {
                headers: Vec::new(),
                payload: payload.into(),
            },
        )
    }

    /// Retained messages on `topic`, oldest first.
    pub fn messages(&self, topic: &str) -> Vec<OutboundMessage> {
        self.shared
            .lock()
            .topics
            .get(topic)
            .map(|log| log.messages.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Total messages ever appended to `topic`, retained or not.
    pub fn published(&self, topic: &str) -> usize {
        self.shared.lock().topics.get(topic).map_or(0, TopicLog::end)
    }

    /// Publishers and subscribers currently open.
    pub fn open_handles(&self) -> usize {
        self.shared.open_handles.load(Ordering::SeqCst)
    }

    /// Consumer groups with a live member on `topic`.
    pub fn groups(&self, topic: &str) -> Vec<String> {
        self.shared
            .lock()
            .groups
            .keys()
            .filter(|(t, _)| t == topic)
            .map(|(_, g)| g.clone())
            .collect()
    }

    fn acquire(&self) -> Arc<Shared> {
        self.shared.open_handles.fetch_add(1, Ordering::SeqCst);
        Arc::clone(&self.shared)
    }
}

impl MessageBroker for MemoryBroker {
    type Publisher = MemoryPublisher;
    type Subscriber = MemorySubscriber;

    fn open_publisher(&mut self, config: &BrokerConfig) -> Result<MemoryPublisher, BrokerError> {
        self.shared.check_access(config)?;
        debug!("MemoryBroker: publisher opened for {}", config.bootstrap_server());
        Ok(MemoryPublisher {
            shared: self.acquire(),
        })
    }

    fn open_subscriber(
        &mut self,
        config: &BrokerConfig,
        topic: &str,
        group_id: &str,
    ) -> Result<MemorySubscriber, BrokerError> {
        self.shared.check_access(config)?;
        {
            let mut state = self.shared.lock();
            let start = match state.offset_reset {
                OffsetReset::Earliest => state.topics.get(topic).map_or(0, |log| log.base),
                OffsetReset::Latest => state.topics.get(topic).map_or(0, TopicLog::end),
            };
            state
                .groups
                .entry((topic.to_string(), group_id.to_string()))
                .or_insert(start);
        }
        debug!("MemoryBroker: group {} joined '{}'", group_id, topic);
        Ok(MemorySubscriber {
            shared: self.acquire(),
            topic: topic.to_string(),
            group_id: group_id.to_string(),
            subscribed: true,
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Channels
// ───────────────────────────────────────────────────────────────

/// Publish side.  Released on drop.
pub struct MemoryPublisher {
    shared: Arc<Shared>,
}

impl PublishChannel for MemoryPublisher {
    fn publish(
        &mut self,
        topic: &str,
        message: &OutboundMessage,
        timeout: Duration,
    ) -> Result<(), BrokerError> {
        let (reachable, acknowledging) = {
            let state = self.shared.lock();
            (state.reachable, state.acknowledging)
        };
        if !reachable {
            return Err(BrokerError::Unreachable("broker went away".into()));
        }
        if !acknowledging {
            thread::sleep(timeout);
            return Err(BrokerError::Timeout);
        }
        let offset = self.shared.append(topic, message.clone());
        trace!("MemoryBroker: '{}' offset {}", topic, offset);
        Ok(())
    }
}

impl Drop for MemoryPublisher {
    fn drop(&mut self) {
        self.shared.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Consumer-group member on one topic.  Leaves the group on drop.
///
/// Groups are single-member: leaving drops the group's committed offset.
pub struct MemorySubscriber {
    shared: Arc<Shared>,
    topic: String,
    group_id: String,
    subscribed: bool,
}

impl MemorySubscriber {
    pub fn group_id(&self) -> &str {
        &self.group_id
    }
}

impl SubscribeChannel for MemorySubscriber {
    fn receive(&mut self, timeout: Duration) -> Result<Delivery, BrokerError> {
        if !self.subscribed {
            return Err(BrokerError::Closed);
        }
        let deadline = Instant::now() + timeout;
        let key = (self.topic.clone(), self.group_id.clone());
        let mut state = self.shared.lock();
        loop {
            if !state.reachable {
                return Err(BrokerError::Unreachable("broker went away".into()));
            }

            let committed = state.groups.get(&key).copied().unwrap_or(0);
            let next = state.topics.get(&self.topic).and_then(|log| {
                // Skip offsets that fell out of retention.
                let offset = committed.max(log.base);
                log.messages
                    .get(offset - log.base)
                    .map(|m| (offset, m.payload.clone()))
            });
            if let Some((offset, payload)) = next {
                state.groups.insert(key, offset + 1);
                return Ok(Delivery::Message(payload));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Delivery::TimedOut);
            }
            state = self
                .shared
                .arrivals
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn unsubscribe(&mut self) {
        if self.subscribed {
            self.subscribed = false;
            self.shared
                .lock()
                .groups
                .remove(&(self.topic.clone(), self.group_id.clone()));
            debug!("MemoryBroker: group {} left '{}'", self.group_id, self.topic);
        }
    }
}

impl Drop for MemorySubscriber {
    fn drop(&mut self) {
        self.unsubscribe();
        self.shared.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}
