//! Threshold evaluator.
//!
//! The query already filters readings to those above the threshold, so
//! the decision here is structural: a row that carries more than one field
//! and includes the value column is a qualifying reading.  A lone column
//! (or no value column) means the store answered with something else, e.g.
//! an empty projection or a diagnostic row.
//!
//! Pure function, no I/O.

use serde_json::Value;

use crate::telemetry::row::QueryResultRow;

/// Decides whether a query result warrants a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdEvaluator {
    value_field: String,
}

impl ThresholdEvaluator {
    pub fn new(value_field: impl Into<String>) -> Self {
        Self {
            value_field: value_field.into(),
        }
    }

    pub fn value_field(&self) -> &str {
        &self.value_field
    }

    /// The triggering value, or `None` when the condition does not hold.
    pub fn evaluate(&self, result: &QueryResultRow) -> Option<Value> {
        if result.len() > 1 {
            result.get(&self.value_field).cloned()
        } else {
            None
        }
    }
}
