//! Bridge configuration parameters
//!
//! Everything a cycle needs to reach the telemetry store, the broker and
//! the target device, plus timing and the trigger rule.
//! Values come from a [`ConfigPort`](crate::app::ports::ConfigPort)
//! source (environment or TOML file) and are resolved once per cycle.

use core::fmt;
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Complete bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub identity: IdentityConfig,
    pub store: StoreConfig,
    pub device: DeviceConfig,
    pub broker: BrokerConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub rule: RuleConfig,
}

/// Service principal used for the telemetry store's OAuth2 flow.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Application (client) id
    pub application_id: String,
    /// Application secret
    pub application_key: String,
    /// Directory tenant id
    pub tenant_id: String,
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("application_id", &self.application_id)
            .field("application_key", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

/// Analytical telemetry store location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Cluster URL, e.g. `https://mycluster.westeurope.kusto.windows.net`
    pub instance_url: String,
    /// Database name
    pub database: String,
    /// Telemetry table joined against the metadata table
    #[serde(default = "default_telemetry_table")]
    pub table: String,
    /// Last-known-value metadata table
    #[serde(default = "default_metadata_table")]
    pub metadata_table: String,
    /// OAuth2 authority the token is requested from
    #[serde(default = "default_login_authority")]
    pub login_authority: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            instance_url: String::new(),
            database: String::new(),
            table: default_telemetry_table(),
            metadata_table: default_metadata_table(),
            login_authority: default_login_authority(),
        }
    }
}

/// The OPC UA server and method the command targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Substring of the publisher name identifying the server application
    pub application_name: String,
    /// Substring of the publisher name identifying the site
    pub location_name: String,
    /// OPC UA endpoint URL of the server
    pub endpoint: String,
    /// Node id of the method to call
    pub method_node_id: String,
    /// Node id of the object owning the method
    pub parent_node_id: String,
}

/// Message broker connection and topics.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker hostname (without port)
    pub hostname: String,
    /// Broker SASL/TLS port
    #[serde(default = "default_broker_port")]
    pub port: u16,
    /// SASL PLAIN username
    pub username: String,
    /// SASL PLAIN password
    pub password: String,
    /// Outbound command topic
    pub topic: String,
    /// Inbound response topic
    pub response_topic: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            port: default_broker_port(),
            username: String::new(),
            password: String::new(),
            topic: String::new(),
            response_topic: String::new(),
        }
    }
}

impl BrokerConfig {
    /// `host:port` string used as the bootstrap server.
    pub fn bootstrap_server(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("topic", &self.topic)
            .field("response_topic", &self.response_topic)
            .finish()
    }
}

/// Cadence and wait bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Delay before each cycle (milliseconds)
    pub cycle_interval_ms: u64,
    /// Wait for a correlated response, reset after each discarded message (milliseconds)
    pub response_timeout_ms: u64,
    /// Wait for the publish acknowledgment (milliseconds)
    pub publish_timeout_ms: u64,
    /// Wait for token acquisition and for the query itself (milliseconds)
    pub query_timeout_ms: u64,
    /// Hard ceiling on everything a single cycle may wait for (milliseconds)
    pub cycle_budget_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: 15_000,
            response_timeout_ms: 15_000,
            publish_timeout_ms: 10_000,
            query_timeout_ms: 30_000,
            cycle_budget_ms: 120_000,
        }
    }
}

impl TimingConfig {
    pub const fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    pub const fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub const fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    pub const fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub const fn cycle_budget(&self) -> Duration {
        Duration::from_millis(self.cycle_budget_ms)
    }
}

/// The trigger rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Telemetry signal name to watch
    pub signal_name: String,
    /// Readings strictly above this value trigger the command
    pub threshold: i64,
    /// Only readings younger than this many minutes are eligible
    pub window_minutes: u32,
    /// Projected column carrying the reading
    pub value_field: String,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            signal_name: "Pressure".to_string(),
            threshold: 4000,
            window_minutes: 10,
            value_field: "NodeValue".to_string(),
        }
    }
}

fn default_telemetry_table() -> String {
    "opcua_telemetry".to_string()
}

fn default_metadata_table() -> String {
    "opcua_metadata_lkv".to_string()
}

fn default_login_authority() -> String {
    "https://login.microsoftonline.com".to_string()
}

const fn default_broker_port() -> u16 {
    9093
}

impl BridgeConfig {
    /// Reject configurations a cycle cannot possibly complete with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("identity.application_id", &self.identity.application_id),
            ("identity.application_key", &self.identity.application_key),
            ("identity.tenant_id", &self.identity.tenant_id),
            ("store.instance_url", &self.store.instance_url),
            ("store.database", &self.store.database),
            ("store.table", &self.store.table),
            ("store.metadata_table", &self.store.metadata_table),
            ("device.application_name", &self.device.application_name),
            ("device.location_name", &self.device.location_name),
            ("device.endpoint", &self.device.endpoint),
            ("device.method_node_id", &self.device.method_node_id),
            ("device.parent_node_id", &self.device.parent_node_id),
            ("broker.hostname", &self.broker.hostname),
            ("broker.username", &self.broker.username),
            ("broker.password", &self.broker.password),
            ("broker.topic", &self.broker.topic),
            ("broker.response_topic", &self.broker.response_topic),
            ("rule.signal_name", &self.rule.signal_name),
            ("rule.value_field", &self.rule.value_field),
        ];
        if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ConfigError::Missing(*name));
        }

        if self.broker.topic == self.broker.response_topic {
            return Err(ConfigError::ValidationFailed(
                "broker.topic and broker.response_topic must differ",
            ));
        }
        if self.broker.port == 0 {
            return Err(ConfigError::ValidationFailed("broker.port must be non-zero"));
        }

        let t = &self.timing;
        if t.cycle_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("timing.cycle_interval_ms must be non-zero"));
        }
        if t.response_timeout_ms == 0 || t.publish_timeout_ms == 0 || t.query_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("timing timeouts must be non-zero"));
        }
        if t.response_timeout_ms > t.cycle_budget_ms || t.publish_timeout_ms > t.cycle_budget_ms {
            return Err(ConfigError::ValidationFailed(
                "timing.cycle_budget_ms must cover the response and publish timeouts",
            ));
        }
        if self.rule.window_minutes == 0 {
            return Err(ConfigError::ValidationFailed("rule.window_minutes must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample() -> BridgeConfig {
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
        timing: TimingConfig::default(),
        rule: RuleConfig::default(),
    }
}
