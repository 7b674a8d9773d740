use thiserror::Error;

/// Errors that can occur when publishing or subscribing.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// The message could not be handed to the broker.
    #[error("Failed to publish to topic {topic}: {reason}")]
    PublishFailed { topic: String, reason: String },

    /// A consumer could not be registered.
    #[error("Failed to subscribe group {group_id} to topic {topic}: {reason}")]
    SubscriptionFailed {
        topic: String,
        group_id: String,
        reason: String,
    },

    /// A payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for event bus operations.
pub type Result<T> = std::result::Result<T, EventBusError>;
