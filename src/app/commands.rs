//! Command records exchanged with the remote commander.
//!
//! [`CommandRequest`] goes out on the command topic; [`CommandResponse`]
//! comes back on the response topic.  The JSON field names are fixed by
//! the commander and must not change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DeviceConfig;

/// The only command verb this bridge issues.
pub const METHOD_CALL: &str = "methodcall";

/// Header attached to every outbound command.
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// A remote method-call request.  Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    #[serde(rename = "Command")]
    command: String,
    #[serde(rename = "TimeStamp")]
    issued_at: DateTime<Utc>,
    #[serde(rename = "CorrelationId")]
    correlation_id: Uuid,
    #[serde(rename = "Endpoint")]
    endpoint: String,
    #[serde(rename = "MethodNodeId")]
    method_id: String,
    #[serde(rename = "ParentNodeId")]
    parent_object_id: String,
}

impl CommandRequest {
    /// Build a method call for the configured device with a fresh
    /// correlation id, stamped now.
    pub fn method_call(device: &DeviceConfig) -> Self {
        Self::with_identity(device, Uuid::new_v4(), Utc::now())
    }

    /// Build a method call with an explicit id and timestamp.
    pub fn with_identity(device: &DeviceConfig, correlation_id: Uuid, issued_at: DateTime<Utc>) -> Self {
        Self {
            command: METHOD_CALL.to_string(),
            issued_at,
            correlation_id,
            endpoint: device.endpoint.clone(),
            method_id: device.method_node_id.clone(),
            parent_object_id: device.parent_node_id.clone(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn method_id(&self) -> &str {
        &self.method_id
    }

    pub fn parent_object_id(&self) -> &str {
        &self.parent_object_id
    }

    /// Wrap the request in a broker message: JSON body plus content-type header.
    pub fn to_message(&self) -> Result<OutboundMessage, serde_json::Error> {
        Ok(OutboundMessage {
            headers: vec![(CONTENT_TYPE_HEADER.to_string(), CONTENT_TYPE_JSON.to_string())],
            payload: serde_json::to_vec(self)?,
        })
    }
}

/// Acknowledgment from the commander.  Every field is required; anything
/// else on the response topic is not a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommandResponse {
    pub correlation_id: Uuid,
    pub success: bool,
    pub status: String,
}

/// A message ready for [`PublishChannel::publish`](super::ports::PublishChannel::publish).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub headers: Vec<(String, String)>,
    pub payload: Vec<u8>,
}

impl OutboundMessage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
