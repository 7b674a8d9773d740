//! Shared types for the order-to-fulfillment pipeline.
//!
//! Everything that crosses a service boundary lives here: the order number
//! identifier, the status vocabulary, topic names and the payload records
//! published on each topic.

#[cfg(feature = "postgres")]
pub mod db;
pub mod events;
pub mod types;

pub use events::{
    OrderPlaced, OrderPlacedItem, OrderStatusUpdated, OtpPurpose, OtpRequested, PaymentSucceeded,
    TopicEvent, topics,
};
pub use types::{OrderNumber, status};
