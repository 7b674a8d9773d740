//! Publish-subscribe messaging for the order pipeline.
//!
//! Messages carry a topic, a routing key and a JSON payload. Consumer groups
//! subscribe to a topic with an explicit handler; each group sees every
//! message once, and messages sharing a key reach a group in publish order.

pub mod bus;
pub mod error;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod memory;
pub mod message;

pub use bus::{EventBus, EventBusExt, EventHandler, HandlerError, MessageHandler, TypedHandler};
pub use error::{EventBusError, Result};
#[cfg(feature = "kafka")]
pub use kafka::KafkaEventBus;
pub use memory::InMemoryEventBus;
pub use message::Message;
