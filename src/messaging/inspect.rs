//! Inbound message classification.
//!
//! The correlator branches on [`Inspection`] instead of catching parse
//! failures: a payload is either the response we wait for, a valid
//! response for some other command, or not a response at all.

use uuid::Uuid;

use crate::app::commands::CommandResponse;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inspection {
    /// Valid response carrying the outstanding correlation id.
    Matched(CommandResponse),
    /// Valid response for a different command.
    Mismatched(CommandResponse),
    /// Not a response document; carries the parse error.
    Unparseable(String),
}

impl Inspection {
    /// Whether the payload was a well-formed response, matching or not.
    pub const fn is_well_formed(&self) -> bool {
        !matches!(self, Self::Unparseable(_))
    }
}

/// Classify `payload` against the outstanding `expected` id.
pub fn inspect(payload: &[u8], expected: Uuid) -> Inspection {
    match serde_json::from_slice::<CommandResponse>(payload) {
        Ok(response) if response.correlation_id == expected => Inspection::Matched(response),
        Ok(response) => Inspection::Mismatched(response),
        Err(e) => Inspection::Unparseable(e.to_string()),
    }
}
