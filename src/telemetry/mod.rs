//! Telemetry side of the cycle: the query text, the row shapes, and the
//! gate that turns store rows into a [`QueryResultRow`].

pub mod gate;
pub mod query;
pub mod row;

pub use gate::TelemetryGate;
pub use query::PressureQuery;
pub use row::{QueryResultRow, RawCell, RawColumn, RawRow};
