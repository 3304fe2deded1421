//! The pressure query.
//!
//! Metadata rows for the configured server application and site are joined
//! to the telemetry feed on `DataSetWriterID`.  Only readings of the watched
//! signal from the recency window are eligible; the window is measured
//! against the server-side timestamp, so it also absorbs ingestion lag.

use crate::config::BridgeConfig;

/// Parameters of the threshold query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PressureQuery {
    pub metadata_table: String,
    pub telemetry_table: String,
    pub application_name: String,
    pub location_name: String,
    pub signal_name: String,
    pub window_minutes: u32,
    pub value_field: String,
    pub threshold: i64,
}

impl PressureQuery {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            metadata_table: config.store.metadata_table.clone(),
            telemetry_table: config.store.table.clone(),
            application_name: config.device.application_name.clone(),
            location_name: config.device.location_name.clone(),
            signal_name: config.rule.signal_name.clone(),
            window_minutes: config.rule.window_minutes,
            value_field: config.rule.value_field.clone(),
            threshold: config.rule.threshold,
        }
    }

    /// Render the query as Kusto text.
    pub fn to_kql(&self) -> String {
        [
            self.metadata_table.clone(),
            format!("| where Name contains {}", quote(&self.application_name)),
            format!("| where Name contains {}", quote(&self.location_name)),
            format!("| join kind = inner({}", self.telemetry_table),
            format!("    | where Name == {}", quote(&self.signal_name)),
            format!("    | where Timestamp > now() - {}m", self.window_minutes),
            ") on DataSetWriterID".to_string(),
            format!("| extend {} = toint(Value)", self.value_field),
            format!("| project Timestamp, {}", self.value_field),
            "| order by Timestamp desc".to_string(),
            format!("| where {} > {}", self.value_field, self.threshold),
        ]
        .join(" ")
    }
}

/// Single-quoted Kusto string literal.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
