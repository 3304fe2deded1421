//! Row shapes on both sides of the telemetry gate.
//!
//! [`RawRow`] is what a [`QueryClient`](crate::app::ports::QueryClient)
//! hands back: every column, including nulls and cells the adapter could
//! not decode.  [`QueryResultRow`] is what the gate extracts from it: only
//! readable, non-null scalars, in column order.

use serde_json::Value;

/// One cell as delivered by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Value(Value),
    Null,
    /// The adapter could not decode this cell; carries the reason.
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub name: String,
    pub cell: RawCell,
}

/// One row as delivered by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub columns: Vec<RawColumn>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, cell: RawCell) -> Self {
        self.columns.push(RawColumn {
            name: name.into(),
            cell,
        });
        self
    }

    /// Builder-style append of a readable value.
    #[must_use]
    pub fn with_value(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(name, RawCell::Value(value.into()))
    }
}

/// Ordered column → scalar mapping extracted from one row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResultRow {
    fields: Vec<(String, Value)>,
}

impl QueryResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `name`, keeping first-seen column order.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for QueryResultRow {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}
