use common::TopicEvent;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A message travelling over the bus.
///
/// The envelope is deliberately flat: topic, routing key and payload, with
/// no version or header fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Logical channel name (e.g., "order.placed").
    pub topic: String,

    /// Routing key. Ordering holds only among messages sharing a key.
    pub key: String,

    /// The payload as JSON.
    pub payload: serde_json::Value,
}

impl Message {
    /// Creates a message from raw parts.
    pub fn new(
        topic: impl Into<String>,
        key: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            topic: topic.into(),
            key: key.into(),
            payload,
        }
    }

    /// Creates a message from a typed payload, taking topic and key from it.
    pub fn from_event<E: TopicEvent>(event: &E) -> Result<Self, serde_json::Error> {
        Ok(Self {
            topic: E::TOPIC.to_string(),
            key: event.key().to_string(),
            payload: serde_json::to_value(event)?,
        })
    }

    /// Decodes the payload into a typed record.
    pub fn decode<E: DeserializeOwned>(&self) -> Result<E, serde_json::Error> {
        E::deserialize(&self.payload)
    }
}
