//! Configuration source adapters.
//!
//! Both implement [`ConfigPort`] and are re-read every cycle, so edits to
//! the environment or the file take effect on the next cycle without a
//! restart.
//!
//! | Source              | Reads from                          |
//! |---------------------|-------------------------------------|
//! | `EnvConfigSource`   | process environment (or a lookup fn)|
//! | `FileConfigSource`  | TOML file                           |

use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::debug;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::{BridgeConfig, StoreConfig};

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

// ───────────────────────────────────────────────────────────────
// Environment
// ───────────────────────────────────────────────────────────────

/// Reads the deployment's environment variables.
///
/// Required: `APPLICATION_ID`, `APPLICATION_KEY`, `AAD_TENANT_ID`,
/// `ADX_INSTANCE_URL`, `ADX_DB_NAME`, `UA_SERVER_APPLICATION_NAME`,
/// `UA_SERVER_LOCATION_NAME`, `UA_SERVER_ENDPOINT`, `UA_SERVER_METHOD_ID`,
/// `UA_SERVER_OBJECT_ID`, `BROKER_NAME`, `BROKER_USERNAME`,
/// `BROKER_PASSWORD`, `TOPIC`, `RESPONSE_TOPIC`.
///
/// Optional: `ADX_TABLE_NAME`, `BROKER_PORT`, `PRESSURE_THRESHOLD`,
/// `CYCLE_INTERVAL_MS`, `RESPONSE_TIMEOUT_MS`, `PUBLISH_TIMEOUT_MS`,
/// `QUERY_TIMEOUT_MS`, `CYCLE_BUDGET_MS`.
pub struct EnvConfigSource {
    lookup: Lookup,
}

impl EnvConfigSource {
    /// Read from the process environment.
    pub fn new() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    /// Read through `lookup` instead of the process environment.
    pub fn with_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        match (self.lookup)(key) {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(ConfigError::Missing(key)),
        }
    }

    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn parsed<T: FromStr>(&self, key: &'static str, slot: &mut T) -> Result<(), ConfigError> {
        if let Some(raw) = self.optional(key) {
            *slot = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Parse(format!("{} is not a valid number: '{}'", key, raw)))?;
        }
        Ok(())
    }
}

impl Default for EnvConfigSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigPort for EnvConfigSource {
    fn load(&self) -> Result<BridgeConfig, ConfigError> {
        let mut cfg = BridgeConfig::default();

        cfg.identity.application_id = self.required("APPLICATION_ID")?;
        cfg.identity.application_key = self.required("APPLICATION_KEY")?;
        cfg.identity.tenant_id = self.required("AAD_TENANT_ID")?;

        cfg.store = StoreConfig {
            instance_url: self.required("ADX_INSTANCE_URL")?,
            database: self.required("ADX_DB_NAME")?,
            ..StoreConfig::default()
        };
        if let Some(table) = self.optional("ADX_TABLE_NAME") {
            cfg.store.table = table;
        }

        cfg.device.application_name = self.required("UA_SERVER_APPLICATION_NAME")?;
        cfg.device.location_name = self.required("UA_SERVER_LOCATION_NAME")?;
        cfg.device.endpoint = self.required("UA_SERVER_ENDPOINT")?;
        cfg.device.method_node_id = self.required("UA_SERVER_METHOD_ID")?;
        cfg.device.parent_node_id = self.required("UA_SERVER_OBJECT_ID")?;

        cfg.broker.hostname = self.required("BROKER_NAME")?;
        cfg.broker.username = self.required("BROKER_USERNAME")?;
        cfg.broker.password = self.required("BROKER_PASSWORD")?;
        cfg.broker.topic = self.required("TOPIC")?;
        cfg.broker.response_topic = self.required("RESPONSE_TOPIC")?;
        self.parsed("BROKER_PORT", &mut cfg.broker.port)?;

        self.parsed("PRESSURE_THRESHOLD", &mut cfg.rule.threshold)?;
        self.parsed("CYCLE_INTERVAL_MS", &mut cfg.timing.cycle_interval_ms)?;
        self.parsed("RESPONSE_TIMEOUT_MS", &mut cfg.timing.response_timeout_ms)?;
        self.parsed("PUBLISH_TIMEOUT_MS", &mut cfg.timing.publish_timeout_ms)?;
        self.parsed("QUERY_TIMEOUT_MS", &mut cfg.timing.query_timeout_ms)?;
        self.parsed("CYCLE_BUDGET_MS", &mut cfg.timing.cycle_budget_ms)?;

        debug!("Config: loaded from environment");
        Ok(cfg)
    }
}

// ───────────────────────────────────────────────────────────────
// TOML file
// ───────────────────────────────────────────────────────────────

/// Reads a TOML document shaped like [`BridgeConfig`].
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for FileConfigSource {
    fn load(&self) -> Result<BridgeConfig, ConfigError> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", self.path.display(), e)))?;
        let cfg = toml::from_str(&text)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", self.path.display(), e)))?;
        debug!("Config: loaded from {}", self.path.display());
        Ok(cfg)
    }
}
