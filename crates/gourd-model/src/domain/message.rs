use serde::Deserialize;
use serde_json::Value;

use crate::{CorrelationToken, ModelError, Properties};

/// Message read from a companion sidecar (`{payload, properties}`).
#[derive(Clone, Debug, PartialEq)]
pub struct CompanionMessage {
    pub payload: Value,
    pub properties: Properties,
}

#[derive(Deserialize)]
struct Sidecar {
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    properties: Option<serde_json::Map<String, Value>>,
}

impl CompanionMessage {
    /// Parse sidecar bytes.
    ///
    /// Malformed JSON yields [`ModelError::InvalidSidecar`]; a well-formed file
    /// without a usable payload (absent or `null`) yields [`ModelError::MissingPayload`].
    /// Missing properties are treated as an empty map; non-string property values are stringified.
    pub fn parse(bytes: &[u8]) -> Result<Self, ModelError> {
        let sidecar: Sidecar =
            serde_json::from_slice(bytes).map_err(|e| ModelError::InvalidSidecar(e.to_string()))?;
        if sidecar.payload.is_null() {
            return Err(ModelError::MissingPayload);
        }

        let properties = sidecar
            .properties
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| match v {
                Value::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect();

        Ok(Self {
            payload: sidecar.payload,
            properties,
        })
    }

    /// Payload as sent over the wire: the JSON encoding of `payload`.
    pub fn payload_bytes(&self) -> Vec<u8> {
        self.payload.to_string().into_bytes()
    }
}

/// One device-to-cloud message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    pub message_id: String,
    pub payload: Vec<u8>,
    pub properties: Properties,
}

impl OutboundMessage {
    pub fn new(message_id: impl Into<String>, payload: Vec<u8>, properties: Properties) -> Self {
        Self {
            message_id: message_id.into(),
            payload,
            properties,
        }
    }
}

/// Result of one send, reported exactly once per message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Ok,
    Error(String),
}

impl DeliveryOutcome {
    #[inline]
    pub fn is_ok(&self) -> bool {
        matches!(self, DeliveryOutcome::Ok)
    }
}

/// Acknowledgment event posted back to the delivery tracker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: String,
    pub token: CorrelationToken,
    pub outcome: DeliveryOutcome,
}
