use thiserror::Error;

/// Errors raised on the notification side.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The notifier could not deliver a notification.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Publishing or subscribing on the bus failed.
    #[error("Event bus error: {0}")]
    Bus(#[from] event_bus::EventBusError),
}

pub type Result<T> = std::result::Result<T, NotificationError>;
