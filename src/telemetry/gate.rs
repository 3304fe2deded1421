//! Telemetry gate: one query, extracted rows.
//!
//! The gate never fails.  A query-level error is logged and yields an
//! empty result, which the threshold evaluator reads as "no condition".
//! A cell that cannot be read is logged and skipped; the rest of its row
//! still counts.

use core::time::Duration;
use std::collections::BTreeMap;

use log::{debug, warn};
use serde_json::Value;

use crate::app::ports::QueryClient;

use super::row::{QueryResultRow, RawCell, RawRow};

/// Runs queries with a fixed per-call timeout.
pub struct TelemetryGate {
    timeout: Duration,
}

impl TelemetryGate {
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Single-aggregate mode: the first row yielding at least one non-null
    /// field is the result; later rows are not inspected.
    pub fn run_query(&self, client: &mut impl QueryClient, query: &str) -> QueryResultRow {
        let Some(rows) = self.fetch(client, query) else {
            return QueryResultRow::new();
        };

        for (index, raw) in rows.iter().enumerate() {
            let row = extract(index, raw);
            if !row.is_empty() {
                debug!("Gate: row {} yielded {} field(s)", index, row.len());
                return row;
            }
        }
        QueryResultRow::new()
    }

    /// Keyed mode: every row, keyed by the string form of `key_field`.
    /// Later rows overwrite earlier rows with the same key.  Rows without a
    /// readable key are skipped.
    pub fn run_query_keyed(
        &self,
        client: &mut impl QueryClient,
        query: &str,
        key_field: &str,
    ) -> BTreeMap<String, QueryResultRow> {
        let mut out = BTreeMap::new();
        let Some(rows) = self.fetch(client, query) else {
            return out;
        };

        for (index, raw) in rows.iter().enumerate() {
            let row = extract(index, raw);
            match row.get(key_field).map(key_string) {
                Some(key) => {
                    out.insert(key, row);
                }
                None => warn!("Gate: row {} has no '{}' key, skipped", index, key_field),
            }
        }
        out
    }

    fn fetch(&self, client: &mut impl QueryClient, query: &str) -> Option<Vec<RawRow>> {
        match client.execute(query, self.timeout) {
            Ok(rows) => Some(rows),
            Err(e) => {
                warn!("Gate: query failed ({}), treating as empty result", e);
                None
            }
        }
    }
}

/// Copy every readable, non-null cell of `raw`.
fn extract(index: usize, raw: &RawRow) -> QueryResultRow {
    let mut row = QueryResultRow::new();
    for column in &raw.columns {
        match &column.cell {
            RawCell::Value(Value::Null) | RawCell::Null => {}
            RawCell::Value(v) => row.insert(column.name.clone(), v.clone()),
            RawCell::Unreadable(reason) => {
                warn!("Gate: row {} column '{}' unreadable: {}", index, column.name, reason);
            }
        }
    }
    row
}

fn key_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
