//! Kafka-backed event bus.
//!
//! Each topic maps onto a Kafka topic and the routing key becomes the Kafka
//! message key, so per-key ordering follows from Kafka's per-partition
//! ordering. Consumer groups map onto Kafka consumer groups.
//!
//! Offsets are committed manually after the handler returns, whatever the
//! outcome. A crash before the commit redelivers the message, which is the
//! at-least-once half of the contract; a handler error never redelivers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message as KafkaMessage;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;

use crate::bus::{EventBus, MessageHandler, deliver};
use crate::{EventBusError, Message, Result};

/// Event bus speaking the Kafka protocol through rdkafka.
pub struct KafkaEventBus {
    producer: FutureProducer,
    brokers: String,
    timeout: Duration,
    auto_offset_reset: String,
}

impl KafkaEventBus {
    /// Creates a bus connected to `brokers` (comma-separated `host:port` list).
    pub fn new(brokers: &str) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .create()
            .map_err(|e| EventBusError::PublishFailed {
                topic: String::new(),
                reason: format!("failed to create producer: {e}"),
            })?;

        tracing::info!(brokers, "kafka event bus created");

        Ok(Self {
            producer,
            brokers: brokers.to_string(),
            timeout: Duration::from_secs(5),
            auto_offset_reset: "earliest".to_string(),
        })
    }

    /// Sets the producer send timeout (default: 5 seconds).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets where new consumer groups start reading (default: "earliest").
    pub fn with_auto_offset_reset(mut self, policy: impl Into<String>) -> Self {
        self.auto_offset_reset = policy.into();
        self
    }

    /// Returns the configured broker list.
    pub fn brokers(&self) -> &str {
        &self.brokers
    }
}

#[async_trait]
impl EventBus for KafkaEventBus {
    async fn publish(&self, message: Message) -> Result<()> {
        let payload = serde_json::to_vec(&message.payload)?;
        let record = FutureRecord::to(&message.topic)
            .key(message.key.as_str())
            .payload(payload.as_slice());

        match self
            .producer
            .send(record, Timeout::After(self.timeout))
            .await
        {
            Ok((partition, offset)) => {
                metrics::counter!("event_bus_published_total", "topic" => message.topic.clone())
                    .increment(1);
                tracing::debug!(
                    topic = %message.topic,
                    key = %message.key,
                    partition,
                    offset,
                    "message published"
                );
                Ok(())
            }
            Err((e, _)) => Err(EventBusError::PublishFailed {
                topic: message.topic,
                reason: e.to_string(),
            }),
        }
    }

    async fn subscribe(
        &self,
        topic: &str,
        group_id: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<()> {
        let subscription_failed = |reason: String| EventBusError::SubscriptionFailed {
            topic: topic.to_string(),
            group_id: group_id.to_string(),
            reason,
        };

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", &self.auto_offset_reset)
            .set("session.timeout.ms", "6000")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| subscription_failed(format!("failed to create consumer: {e}")))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| subscription_failed(e.to_string()))?;

        tracing::info!(topic, group_id, "subscribed to kafka topic");

        let group_id = group_id.to_string();
        tokio::spawn(async move {
            let mut stream = consumer.stream();

            while let Some(received) = stream.next().await {
                let borrowed = match received {
                    Ok(borrowed) => borrowed,
                    Err(e) => {
                        tracing::warn!(group_id = %group_id, error = %e, "kafka receive error");
                        continue;
                    }
                };

                let key = borrowed
                    .key()
                    .map(|k| String::from_utf8_lossy(k).into_owned())
                    .unwrap_or_default();
                let payload = borrowed
                    .payload()
                    .map(serde_json::from_slice::<serde_json::Value>);

                match payload {
                    Some(Ok(payload)) => {
                        let message = Message::new(borrowed.topic(), key, payload);
                        deliver(handler.as_ref(), &message, &group_id).await;
                    }
                    Some(Err(e)) => {
                        tracing::error!(
                            topic = borrowed.topic(),
                            key = %key,
                            error = %e,
                            "undecodable payload; message dropped"
                        );
                    }
                    None => {
                        tracing::error!(
                            topic = borrowed.topic(),
                            key = %key,
                            "empty payload; message dropped"
                        );
                    }
                }

                if let Err(e) = consumer.commit_message(&borrowed, CommitMode::Async) {
                    tracing::warn!(
                        group_id = %group_id,
                        error = %e,
                        "offset commit failed; message may be redelivered"
                    );
                }
            }

            tracing::debug!(group_id = %group_id, "kafka consumer exiting");
        });

        Ok(())
    }
}
