//! Mock adapters for integration tests.
//!
//! The store and the broker record every call so tests can assert on what
//! a cycle opened, queried, published and released.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uaaction::adapters::memory_broker::{MemoryBroker, MemoryPublisher, MemorySubscriber};
use uaaction::app::commands::{CommandRequest, CommandResponse, OutboundMessage};
use uaaction::app::events::BridgeEvent;
use uaaction::app::ports::{
    BrokerError, ConfigError, ConfigPort, Delivery, EventSink, MessageBroker, PublishChannel,
    QueryClient, QueryError, SubscribeChannel, TelemetryStore,
};
use uaaction::config::{
    BridgeConfig, BrokerConfig, DeviceConfig, IdentityConfig, StoreConfig, TimingConfig,
};
use uaaction::telemetry::RawRow;

// ── Config ────────────────────────────────────────────────────

/// Valid configuration with short waits.
pub fn test_config() -> BridgeConfig {
    BridgeConfig {
        identity: IdentityConfig {
            application_id: "app-id".into(),
            application_key: "app-secret".into(),
            tenant_id: "tenant".into(),
        },
        store: StoreConfig {
            instance_url: "https://adx.example.net".into(),
            database: "telemetry".into(),
            ..StoreConfig::default()
        },
        device: DeviceConfig {
            application_name: "UA.Server".into(),
            location_name: "Munich".into(),
            endpoint: "opc.tcp://munich:4840".into(),
            method_node_id: "ns=2;i=15".into(),
            parent_node_id: "ns=2;i=1".into(),
        },
        broker: BrokerConfig {
            hostname: "broker.example.net".into(),
            username: "$ConnectionString".into(),
            password: "secret".into(),
            topic: "commander.command".into(),
            response_topic: "commander.response".into(),
            ..BrokerConfig::default()
        },
        timing: TimingConfig {
            cycle_interval_ms: 10,
            response_timeout_ms: 150,
            publish_timeout_ms: 100,
            query_timeout_ms: 100,
            cycle_budget_ms: 2_000,
        },
        ..BridgeConfig::default()
    }
}

/// Returns the same result on every load.
pub struct FixedConfig(pub Result<BridgeConfig, ConfigError>);

impl FixedConfig {
    pub fn valid() -> Self {
        Self(Ok(test_config()))
    }
}

impl ConfigPort for FixedConfig {
    fn load(&self) -> Result<BridgeConfig, ConfigError> {
        self.0.clone()
    }
}

// ── Telemetry store ───────────────────────────────────────────

/// Store that hands out clients returning canned rows.
pub struct MockStore {
    open_result: Result<(), QueryError>,
    rows: Result<Vec<RawRow>, QueryError>,
    pub opens: usize,
    pub queries: Arc<Mutex<Vec<String>>>,
    live: Arc<AtomicUsize>,
}

impl MockStore {
    pub fn with_rows(rows: Vec<RawRow>) -> Self {
        Self {
            open_result: Ok(()),
            rows: Ok(rows),
            opens: 0,
            queries: Arc::new(Mutex::new(Vec::new())),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// One qualifying reading.
    pub fn high_pressure() -> Self {
        Self::with_rows(vec![
            RawRow::new()
                .with_value("Timestamp", "2024-05-01T10:00:00Z")
                .with_value("NodeValue", 4200),
        ])
    }

    pub fn empty() -> Self {
        Self::with_rows(Vec::new())
    }

    pub fn failing_open(err: QueryError) -> Self {
        Self {
            open_result: Err(err),
            ..Self::empty()
        }
    }

    pub fn failing_query(err: QueryError) -> Self {
        Self {
            rows: Err(err),
            ..Self::empty()
        }
    }

    pub fn live_clients(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

pub struct MockClient {
    rows: Result<Vec<RawRow>, QueryError>,
    queries: Arc<Mutex<Vec<String>>>,
    live: Arc<AtomicUsize>,
}

impl TelemetryStore for MockStore {
    type Client = MockClient;

    fn open(
        &mut self,
        _identity: &IdentityConfig,
        _store: &StoreConfig,
        _timeout: Duration,
    ) -> Result<MockClient, QueryError> {
        self.opens += 1;
        self.open_result.clone()?;
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(MockClient {
            rows: self.rows.clone(),
            queries: Arc::clone(&self.queries),
            live: Arc::clone(&self.live),
        })
    }
}

impl QueryClient for MockClient {
    fn execute(&mut self, query: &str, _timeout: Duration) -> Result<Vec<RawRow>, QueryError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.rows.clone()
    }
}

impl Drop for MockClient {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// ── Broker with a scripted commander ──────────────────────────

/// How the fake commander reacts to a published command.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer with the command's correlation id.
    Answer { success: bool, status: String },
    /// Never answer.
    Silent,
    /// Push garbage and a response for another command, then answer.
    NoiseThenAnswer { success: bool, status: String },
    /// Blow up inside the publish call.
    Panic,
}

impl Reply {
    pub fn success() -> Self {
        Self::Answer {
            success: true,
            status: "Good".into(),
        }
    }
}

/// [`MemoryBroker`] whose publish side triggers an immediate commander reply.
#[derive(Clone)]
pub struct AutoReplyBroker {
    pub inner: MemoryBroker,
    reply: Reply,
}

impl AutoReplyBroker {
    pub fn new(reply: Reply) -> Self {
        Self {
            inner: MemoryBroker::new(),
            reply,
        }
    }

    /// Same broker, different commander behavior.
    pub fn with_reply(&self, reply: Reply) -> Self {
        Self {
            inner: self.inner.clone(),
            reply,
        }
    }

    /// Correlation ids of every command published so far.
    pub fn sent_ids(&self, topic: &str) -> Vec<uuid::Uuid> {
        self.inner
            .messages(topic)
            .iter()
            .filter_map(|m| serde_json::from_slice::<CommandRequest>(&m.payload).ok())
            .map(|r| r.correlation_id())
            .collect()
    }
}

pub struct AutoReplyPublisher {
    inner: MemoryPublisher,
    broker: MemoryBroker,
    reply: Reply,
    response_topic: String,
}

impl MessageBroker for AutoReplyBroker {
    type Publisher = AutoReplyPublisher;
    type Subscriber = MemorySubscriber;

    fn open_publisher(&mut self, config: &BrokerConfig) -> Result<AutoReplyPublisher, BrokerError> {
        Ok(AutoReplyPublisher {
            inner: self.inner.open_publisher(config)?,
            broker: self.inner.clone(),
            reply: self.reply.clone(),
            response_topic: config.response_topic.clone(),
        })
    }

    fn open_subscriber(
        &mut self,
        config: &BrokerConfig,
        topic: &str,
        group_id: &str,
    ) -> Result<MemorySubscriber, BrokerError> {
        self.inner.open_subscriber(config, topic, group_id)
    }
}

fn response(id: uuid::Uuid, success: bool, status: &str) -> Vec<u8> {
    serde_json::to_vec(&CommandResponse {
        correlation_id: id,
        success,
        status: status.to_string(),
    })
    .unwrap()
}

impl PublishChannel for AutoReplyPublisher {
    fn publish(
        &mut self,
        topic: &str,
        message: &OutboundMessage,
        timeout: Duration,
    ) -> Result<(), BrokerError> {
        if matches!(self.reply, Reply::Panic) {
            panic!("commander link exploded");
        }
        self.inner.publish(topic, message, timeout)?;

        let request: CommandRequest = serde_json::from_slice(&message.payload).unwrap();
        let id = request.correlation_id();
        match &self.reply {
            Reply::Answer { success, status } => {
                self.broker
                    .publish_raw(&self.response_topic, response(id, *success, status));
            }
            Reply::NoiseThenAnswer { success, status } => {
                self.broker.publish_raw(&self.response_topic, "{not json");
                self.broker
                    .publish_raw(&self.response_topic, response(uuid::Uuid::new_v4(), true, "Good"));
                self.broker
                    .publish_raw(&self.response_topic, response(id, *success, status));
            }
            Reply::Silent | Reply::Panic => {}
        }
        Ok(())
    }
}

// ── Scripted subscriber ───────────────────────────────────────

/// Shared record of what a [`ScriptedBroker`] was asked to do.
#[derive(Debug, Default)]
pub struct ScriptLog {
    pub waits: Vec<Duration>,
    pub groups: Vec<String>,
    pub unsubscribes: usize,
}

/// Broker whose subscriber replays a fixed list of deliveries.
pub struct ScriptedBroker {
    script: VecDeque<Result<Delivery, BrokerError>>,
    pub log: Arc<Mutex<ScriptLog>>,
}

impl ScriptedBroker {
    pub fn new(script: impl IntoIterator<Item = Result<Delivery, BrokerError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            log: Arc::new(Mutex::new(ScriptLog::default())),
        }
    }

    /// Subscriber that only ever times out.
    pub fn silent() -> Self {
        Self::new(VecDeque::new())
    }
}

pub struct ScriptedSubscriber {
    script: VecDeque<Result<Delivery, BrokerError>>,
    log: Arc<Mutex<ScriptLog>>,
}

pub struct NullPublisher;

impl PublishChannel for NullPublisher {
    fn publish(&mut self, _: &str, _: &OutboundMessage, _: Duration) -> Result<(), BrokerError> {
        Ok(())
    }
}

impl MessageBroker for ScriptedBroker {
    type Publisher = NullPublisher;
    type Subscriber = ScriptedSubscriber;

    fn open_publisher(&mut self, _config: &BrokerConfig) -> Result<NullPublisher, BrokerError> {
        Ok(NullPublisher)
    }

    fn open_subscriber(
        &mut self,
        _config: &BrokerConfig,
        _topic: &str,
        group_id: &str,
    ) -> Result<ScriptedSubscriber, BrokerError> {
        self.log.lock().unwrap().groups.push(group_id.to_string());
        Ok(ScriptedSubscriber {
            script: std::mem::take(&mut self.script),
            log: Arc::clone(&self.log),
        })
    }
}

impl SubscribeChannel for ScriptedSubscriber {
    fn receive(&mut self, timeout: Duration) -> Result<Delivery, BrokerError> {
        self.log.lock().unwrap().waits.push(timeout);
        self.script.pop_front().unwrap_or(Ok(Delivery::TimedOut))
    }

    fn unsubscribe(&mut self) {
        self.log.lock().unwrap().unsubscribes += 1;
    }
}

// ── Event sink ────────────────────────────────────────────────

/// Collects every emitted event.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<BridgeEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&BridgeEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &BridgeEvent) {
        self.events.push(event.clone());
    }
}
