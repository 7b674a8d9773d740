use std::any::Any;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use common::TopicEvent;
use futures_util::FutureExt;
use serde::de::DeserializeOwned;

use crate::{Message, Result};

/// Error returned by a handler. Only ever logged by the bus.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives raw messages for one consumer group.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Processes a single message.
    async fn handle(&self, message: &Message) -> std::result::Result<(), HandlerError>;
}

/// Receives decoded payloads of type `E`.
#[async_trait]
pub trait EventHandler<E>: Send + Sync {
    /// Processes a single decoded payload.
    async fn handle(&self, event: E) -> std::result::Result<(), HandlerError>;
}

/// Adapts an [`EventHandler`] into a [`MessageHandler`] by decoding the payload.
///
/// A payload that fails to decode is reported as a handler error.
pub struct TypedHandler<E, H> {
    handler: H,
    _event: PhantomData<fn() -> E>,
}

impl<E, H> TypedHandler<E, H> {
    /// Wraps a typed handler.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _event: PhantomData,
        }
    }
}

#[async_trait]
impl<E, H> MessageHandler for TypedHandler<E, H>
where
    E: DeserializeOwned + Send + 'static,
    H: EventHandler<E>,
{
    async fn handle(&self, message: &Message) -> std::result::Result<(), HandlerError> {
        let event: E = message.decode()?;
        self.handler.handle(event).await
    }
}

/// Core trait for event bus implementations.
///
/// Delivery is at-least-once per consumer group. Messages sharing a key are
/// delivered to a group in publish order; nothing is promised across keys or
/// topics. A handler error is logged and the message counts as consumed:
/// there is no retry and no dead-letter topic.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publishes a message.
    async fn publish(&self, message: Message) -> Result<()>;

    /// Registers `handler` as a member of `group_id` on `topic`.
    ///
    /// Every group receives its own copy of each message. Registering several
    /// handlers under one group splits the topic's partitions between them.
    async fn subscribe(
        &self,
        topic: &str,
        group_id: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<()>;
}

/// Extension trait providing typed helpers on top of [`EventBus`].
#[async_trait]
pub trait EventBusExt: EventBus {
    /// Encodes and publishes a typed payload on its topic, keyed by its key.
    async fn publish_event<E: TopicEvent + Sync>(&self, event: &E) -> Result<()> {
        let message = Message::from_event(event)?;
        self.publish(message).await
    }

    /// Publishes a payload whose triggering write has already committed.
    ///
    /// The publish is not transactional with that commit. A failure here is
    /// logged and swallowed, so the event is lost for good: there is no
    /// outbox and no retry. Returns whether the publish succeeded.
    async fn publish_after_commit<E: TopicEvent + Sync>(&self, event: &E) -> bool {
        match self.publish_event(event).await {
            Ok(()) => {
                tracing::info!(topic = E::TOPIC, key = event.key(), "event published");
                true
            }
            Err(e) => {
                metrics::counter!("event_bus_publish_failures_total", "topic" => E::TOPIC)
                    .increment(1);
                tracing::error!(
                    topic = E::TOPIC,
                    key = event.key(),
                    error = %e,
                    "failed to publish event after commit; event is lost"
                );
                false
            }
        }
    }

    /// Subscribes a typed handler to the topic of `E`.
    async fn subscribe_to<E, H>(&self, group_id: &str, handler: H) -> Result<()>
    where
        E: TopicEvent + DeserializeOwned + Send + 'static,
        H: EventHandler<E> + 'static,
    {
        self.subscribe(E::TOPIC, group_id, Arc::new(TypedHandler::<E, H>::new(handler)))
            .await
    }
}

// Blanket implementation for all EventBus implementations
impl<T: EventBus + ?Sized> EventBusExt for T {}

/// Hands one message to a handler and applies the failure policy.
///
/// Every bus implementation routes deliveries through here so the
/// log-and-continue behaviour lives in one place. A handler that panics is
/// treated like one that returned an error. Returns whether the handler
/// succeeded; the message is consumed either way.
pub(crate) async fn deliver(
    handler: &dyn MessageHandler,
    message: &Message,
    group_id: &str,
) -> bool {
    let error: HandlerError = match AssertUnwindSafe(handler.handle(message))
        .catch_unwind()
        .await
    {
        Ok(Ok(())) => return true,
        Ok(Err(e)) => e,
        Err(panic) => panic_message(panic).into(),
    };

    metrics::counter!(
        "event_bus_handler_failures_total",
        "topic" => message.topic.clone(),
        "group" => group_id.to_string()
    )
    .increment(1);
    tracing::error!(
        topic = %message.topic,
        key = %message.key,
        group_id,
        error = %error,
        "handler failed; message dropped"
    );
    false
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("handler panicked: {detail}")
}
